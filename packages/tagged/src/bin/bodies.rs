use std::io::Write;

use tagged::{Engine, EntityId, FieldDef, FieldType, KindDef, SystemDef, TraitDef, Value};

const G: f64 = 10.0;
const TIME_STEP: f64 = 0.01;

fn float(engine: &Engine, id: EntityId, field: &str) -> f64 {
    engine.entity(id)
        .and_then(|e| e.get(field))
        .and_then(Value::as_float)
        .unwrap_or(0.0)
}

fn main() {
    let mut engine = Engine::new();
    engine.declare_trait(TraitDef::new("position")
        .field(FieldDef::new("x", FieldType::Float))
        .field(FieldDef::new("y", FieldType::Float))).unwrap();
    engine.declare_trait(TraitDef::new("velocity")
        .field(FieldDef::new("vx", FieldType::Float))
        .field(FieldDef::new("vy", FieldType::Float))).unwrap();
    engine.declare_trait(TraitDef::new("mass")
        .field(FieldDef::with_default("m", 1.0))).unwrap();
    engine.declare_kind(KindDef::new("body")
        .with("position")
        .with("velocity")
        .with("mass")).unwrap();

    // Both arguments match every body, so each pair is seen in both orders
    // and every body is paired with itself.
    engine.declare_system(SystemDef::new("attract", |engine, args| {
        let (a, b) = (args[0], args[1]);
        if a == b {
            return Ok(());
        }

        let dx = float(engine, b, "x") - float(engine, a, "x");
        let dy = float(engine, b, "y") - float(engine, a, "y");
        let r2 = dx * dx + dy * dy;
        if r2 < 0.0005 {
            return Ok(());
        }

        let accel = G * float(engine, b, "m") / r2;
        let r = r2.sqrt();
        let vx = float(engine, a, "vx") + TIME_STEP * dx * accel / r;
        let vy = float(engine, a, "vy") + TIME_STEP * dy * accel / r;
        if let Some(body) = engine.entity_mut(a) {
            body.set("vx", vx)?;
            body.set("vy", vy)?;
        }
        Ok(())
    }).arg(&["position", "mass"]).arg(&["position", "mass"])).unwrap();

    engine.declare_system(SystemDef::new("integrate", |engine, args| {
        let x = float(engine, args[0], "x") + TIME_STEP * float(engine, args[0], "vx");
        let y = float(engine, args[0], "y") + TIME_STEP * float(engine, args[0], "vy");
        if let Some(body) = engine.entity_mut(args[0]) {
            body.set("x", x)?;
            body.set("y", y)?;
        }
        Ok(())
    }).inline(true).arg(&["position", "velocity"])).unwrap();

    for idx in 0..16 {
        let angle = idx as f64 * std::f64::consts::TAU / 16.0;
        engine.create_entity("body", &[
            ("x", Value::Float(angle.cos())),
            ("y", Value::Float(angle.sin())),
            ("m", Value::Float(1.0 + idx as f64)),
        ]).unwrap();
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for step in 0..100 {
        engine.run_system("attract").unwrap();
        engine.run_system("integrate").unwrap();

        if step % 10 == 0 {
            let first = EntityId::new(1);
            writeln!(out, "step {}: ({:.3}, {:.3})", step,
                     float(&engine, first, "x"), float(&engine, first, "y")).unwrap();
        }
    }
}
