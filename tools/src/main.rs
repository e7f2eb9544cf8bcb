//! sim-runner: headless runner for the economy simulation.
//!
//! Usage:
//!   sim-runner --seed 42 --steps 240 --income-tax 0.1 --corp-tax 0.1 --ubi 0
//!   sim-runner --config data/economy.json --db run.db
//!   sim-runner --ipc-mode

use anyhow::Result;
use econ_core::{
    config::SimConfig,
    engine::SimEngine,
    firm::FirmState,
    fiscal::FiscalPolicy,
    household::HouseholdState,
    metrics::MarketStats,
    store::{SimStore, StatsRecord},
    types::Step,
};
use std::env;
use std::io::{self, BufRead, Write};
use uuid::Uuid;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Step {
        #[serde(default = "one")]
        count: u64,
        #[serde(default)]
        policy: Option<FiscalPolicy>,
    },
    Reset {
        seed: u64,
    },
    Quit,
}

fn one() -> u64 {
    1
}

#[derive(serde::Serialize)]
struct UiState {
    step: Step,
    stats: MarketStats,
    govt_cash: f64,
    firms: Vec<FirmState>,
    households: Vec<HouseholdState>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");

    let mut config = match find_arg(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    config.random_seed = parse_arg(&args, "--seed", config.random_seed);
    let steps = parse_arg(&args, "--steps", 240u64);
    let policy = FiscalPolicy::new(
        parse_arg(&args, "--income-tax", 0.1),
        parse_arg(&args, "--corp-tax", 0.1),
        parse_arg(&args, "--ubi", 0.0),
    );
    let db = find_arg(&args, "--db").unwrap_or(":memory:");

    let store = SimStore::open(db)?;
    store.migrate()?;
    let run_id = format!("run-{}", Uuid::new_v4());
    let seed = config.random_seed;

    if !ipc_mode {
        println!("Economy Simulation - sim-runner");
        println!("  run_id:      {run_id}");
        println!("  seed:        {seed}");
        println!("  steps:       {steps}");
        println!("  policy:      income {:.2} / corp {:.2} / ubi {:.2}",
            policy.income_tax_rate, policy.corp_tax_rate, policy.ubi_amount);
        println!("  db:          {db}");
        println!();
    }

    let mut engine = SimEngine::new(run_id, config, store)?;

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        for _ in 0..steps {
            engine.step(policy)?;
            let (year, month) = engine.clock.calendar();
            if month == 0 {
                let s = engine.get_market_stats();
                println!(
                    "Year {year:2}: unemp={:5.1}% price={:8.2} wage={:8.2} gdp={:10.2} gini={:.3}",
                    s.unemployment * 100.0, s.avg_price, s.avg_wage, s.gdp, s.gini
                );
            }
        }
        log::info!("run={} finished at step {}", engine.run_id, engine.clock.current_step);
        print_summary(&engine)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Unknown command: {}", buffer.trim());
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {}
            IpcCommand::Step { count, policy } => {
                engine.run_steps(count, policy.unwrap_or_default())?;
            }
            IpcCommand::Reset { seed } => {
                engine.reset(seed)?;
            }
        }

        writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(engine))?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn build_ui_state(engine: &SimEngine) -> UiState {
    let snapshot = engine.snapshot();
    UiState {
        step: snapshot.step,
        stats: snapshot.stats,
        govt_cash: snapshot.government.cash,
        firms: snapshot.firms,
        households: snapshot.households,
    }
}

fn print_summary(engine: &SimEngine) -> Result<()> {
    let history = engine.stats_history()?;
    let snapshot = engine.snapshot();
    let Some(last) = history.last() else {
        println!("  (No steps run)");
        return Ok(());
    };

    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {}", engine.run_id);
    println!("  final step:      {}", engine.clock.current_step);
    println!("  unemployment:    {:.1}%", last.stats.unemployment * 100.0);
    println!("  avg price:       {:.2}", last.stats.avg_price);
    println!("  avg wage:        {:.2}", last.stats.avg_wage);
    println!("  gdp:             {:.2}", last.stats.gdp);
    println!("  gini:            {:.3}", last.stats.gini);
    println!("  tax revenue:     {:.2}", last.stats.tax_revenue);
    println!("  govt cash:       {:.2}", last.govt_cash);
    println!("  avg firm cash:   {:.2}", last.avg_firm_cash);
    println!("  avg hh cash:     {:.2}", last.avg_household_cash);
    println!("  bankruptcies:    {}", last.total_bankruptcies);
    let tiers = snapshot.tier_counts(engine.config().max_tier());
    println!("  tiers:           {tiers:?}");
    println!("  largest share:   {:.1}%", snapshot.max_employment_share() * 100.0);

    println!();
    println!("=== STABILITY ANALYSIS ===");
    for line in stability_report(&history) {
        println!("  {line}");
    }
    Ok(())
}

fn stability_report(history: &[StatsRecord]) -> Vec<String> {
    let mut lines = Vec::new();
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return lines;
    };

    let avg_unemp =
        history.iter().map(|r| r.stats.unemployment).sum::<f64>() / history.len() as f64;
    lines.push(if avg_unemp > 0.5 {
        "[FAIL] High unemployment: average > 50%".to_string()
    } else if avg_unemp < 0.05 {
        "[WARN] Low unemployment: average < 5% (labor shortage?)".to_string()
    } else {
        "[PASS] Employment levels healthy".to_string()
    });

    let start_price = first.stats.avg_price;
    let inflation = if start_price > 0.0 {
        (last.stats.avg_price - start_price) / start_price
    } else {
        0.0
    };
    lines.push(format!("Total inflation: {:.1}%", inflation * 100.0));
    lines.push(if inflation > 50.0 {
        "[WARN] High inflation detected".to_string()
    } else if inflation < -0.5 {
        "[FAIL] Deflationary spiral detected".to_string()
    } else {
        "[PASS] Price stability acceptable".to_string()
    });

    lines.push(if last.avg_tier <= 1.1 {
        "[FAIL] Stagnation: firms are not upgrading tiers".to_string()
    } else {
        "[PASS] Economic growth: firms are upgrading".to_string()
    });

    lines.push(if last.avg_household_cash < 100.0 {
        "[FAIL] Poverty: households are broke".to_string()
    } else {
        "[PASS] Household wealth exists".to_string()
    });

    lines
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    find_arg(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
