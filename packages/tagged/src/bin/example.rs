use std::cell::Cell;
use std::rc::Rc;

use tagged::{Engine, FieldDef, FieldType, GameLoop, KindDef, LoopConfig, Scene, SceneEvent, SystemDef, TraitDef, Value};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut engine = Engine::new();
    engine.declare_trait(TraitDef::new("edible")
        .field(FieldDef::new("energy", FieldType::Int))).unwrap();
    engine.declare_kind(KindDef::new("potion").with("edible")).unwrap();

    let eaten = Rc::new(Cell::new(0));
    let counter = eaten.clone();
    engine.declare_system(SystemDef::new("eat", move |engine, args| {
        let energy = engine.entity(args[0])
            .and_then(|e| e.get("energy"))
            .and_then(Value::as_int)
            .unwrap_or(0);
        println!("eating {:?} for {} energy", args[0], energy);
        counter.set(counter.get() + 1);
        engine.destroy_entity(args[0])?;
        Ok(())
    }).arg(&["edible"])).unwrap();

    engine.register_scene(Scene::new("kitchen")
        .on(SceneEvent::Initialized, |engine, _| {
            for energy in 1..=3 {
                engine.create_entity("potion", &[("energy", Value::Int(energy))])?;
            }
            Ok(())
        })
        .on(SceneEvent::Update, |engine, _| {
            engine.run_system("eat")?;
            Ok(())
        }));

    let config = LoopConfig {
        target_fps: Some(60),
        initial_scene: Some("kitchen".to_owned()),
        ..LoopConfig::default()
    };
    GameLoop::new(config).run(&mut engine, 1).unwrap();

    println!("eaten: {}", eaten.get());
    println!("potions left: {}", engine.entity_count());
}
