use kanesim::{Scenario, ScenarioConfig};

use anyhow::{ensure, Context, Result};
use clap::Parser;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short, default_value = "mass_spring_damper.yaml")]
    file_name: String,
}

// load here to keep main clean
fn load_scenario_from_yaml() -> Result<ScenarioConfig> {
    let args = Args::parse();
    let file_name = args.file_name;

    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(&file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("opening scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    let scenario_cfg = load_scenario_from_yaml()?;
    let scenario = Scenario::build_scenario(scenario_cfg)?;

    // Show what was derived before running anything numeric
    let bundle = scenario.system.bundle();
    println!("=== Equations of motion (Kane's method) ===");
    let state_names: Vec<String> = bundle
        .state_symbols()
        .iter()
        .map(|s| s.to_string())
        .collect();
    println!("state: [{}]", state_names.join(", "));
    for (i, row) in bundle.mass_matrix.iter().enumerate() {
        let entries: Vec<String> = row.iter().map(|e| e.to_string()).collect();
        println!("  M[{i}] = [{}]   f[{i}] = {}", entries.join(", "), bundle.forcing[i]);
    }
    println!("=== Newton force balance ===");
    for (sym, rhs) in bundle.state_symbols().iter().zip(&scenario.manual_rhs) {
        println!("  d{}/dt = {}", sym, rhs);
    }

    // The two derivations must agree before we trust either
    ensure!(
        bundle.state_derivatives_agree(&scenario.manual_rhs, 1e-9),
        "Newton and Kane derivations disagree"
    );
    println!("derivation cross-check passed");

    let times = scenario.parameters.time_grid();
    let trajectory = scenario
        .system
        .integrate(&times, &scenario.engine, &scenario.parameters)?;

    // Trajectory summary
    let x_series = trajectory
        .series(&scenario.coordinate)
        .context("coordinate missing from trajectory")?;
    let v_series = trajectory
        .series(&scenario.speed)
        .context("speed missing from trajectory")?;
    let constants = scenario.system.constants();
    let constant = |name: &str| {
        constants
            .iter()
            .find(|(s, _)| s.name() == name)
            .map(|(_, v)| *v)
            .with_context(|| format!("constant `{name}` not bound"))
    };
    let equilibrium = constant("m")? * constant("g")? / constant("k")?;
    println!(
        "integrated {} samples over [0, {}]",
        trajectory.len(),
        scenario.parameters.t_end
    );
    println!(
        "x: start {:.4}, peak {:.4}, final {:.4} (equilibrium {:.4})",
        x_series[0],
        x_series.iter().cloned().fold(f64::MIN, f64::max),
        x_series[x_series.len() - 1],
        equilibrium
    );
    println!("v: final {:.4}", v_series[v_series.len() - 1]);

    // Scene document
    let document = scenario.scene.render(&scenario.system, &trajectory)?;
    if let Some(path) = &scenario.scene_output {
        let json = serde_json::to_string_pretty(&document)?;
        std::fs::write(path, json).with_context(|| format!("writing scene to {path}"))?;
        println!("scene written to {path}");
    }

    Ok(())
}
