//! `wardens bundles`: Print decision bundles in evaluation order.

use serde_json::json;
use wardens_agent::BundleSet;
use wardens_agent::decision::ModuleInfo;
use wardens_core::Persona;

fn print_table(title: &str, modules: &[ModuleInfo]) {
    println!("{title}");
    for (i, module) in modules.iter().enumerate() {
        println!(
            "  {:>2}. {:<28} {:>5.0}%{}",
            i + 1,
            module.name,
            module.chance * 100.0,
            if module.continues { "  (continues)" } else { "" }
        );
    }
    println!();
}

pub async fn run(persona: Option<Persona>, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let set = BundleSet::stock();
    let personas: Vec<Persona> = match persona {
        Some(p) => vec![p],
        None => Persona::ALL.to_vec(),
    };
    let standard = BundleSet::describe(set.standard());

    if as_json {
        let by_persona: serde_json::Map<String, serde_json::Value> = personas
            .iter()
            .map(|p| {
                let modules = BundleSet::describe(set.for_persona(*p));
                serde_json::to_value(modules).map(|value| (p.to_string(), value))
            })
            .collect::<Result<_, serde_json::Error>>()?;
        let out = json!({ "standard": standard, "personas": by_persona });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for p in personas {
        print_table(&format!("Persona: {p}"), &BundleSet::describe(set.for_persona(p)));
    }
    print_table("Standard (every idle tick)", &standard);

    Ok(())
}
