use tagged::{Engine, KindDef, SystemDef, TraitDef};

fn main() {
    let mut engine = Engine::new();
    engine.declare_trait(TraitDef::new("ticking")).unwrap();
    engine.declare_kind(KindDef::new("clock").with("ticking")).unwrap();
    engine.declare_system(SystemDef::new("tick", |_, _| Ok(())).arg(&["ticking"])).unwrap();

    let mut to_delete = Vec::new();

    for _ in 0..8 {
        for id in to_delete.drain(..) {
            engine.destroy_entity(id).unwrap();
        }

        for idx in 0..512 {
            let id = engine.create_entity("clock", &[]).unwrap();

            if idx % 12 == 11 {
                to_delete.push(id);
            }
        }

        engine.run_system("tick").unwrap();
    }

    println!("entities: {}", engine.entity_count());
}
