//! iCFTL: a runtime verification tool driving SCFG construction, static
//! analysis and a short online monitoring session end to end.
//!
//! This binary is a "host" surface: it builds a small demonstration program
//! in-process rather than parsing source from disk, since a real front end
//! is an external collaborator the framework's data model is shaped to
//! receive, not something this crate implements.

use argh::FromArgs;

use ahash::AHashMap;
use icftl_analysis::{plan, Analyser, EmitKind};
use icftl_ast::{Expr, Function, Location, Stmt};
use icftl_monitor::{ColorConfig as MonitorColorConfig, HostingMode, LoggingConfigDefaults, Monitor, RuntimeConfig};
use icftl_scfg::{Predicate, Scfg};
use icftl_spec::{Expression, Specification, SpecificationBuilder};
use icftl_utils::{Id, IcftlResult};

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help"))]
/// Runtime verification for a small demonstration program
struct Opts {
    /// print the demo program's symbolic control-flow graphs and exit
    #[argh(switch, long = "print-scfg")]
    print_scfg: bool,

    /// print the computed instrumentation plan and exit
    #[argh(switch, long = "print-plan")]
    print_plan: bool,

    /// run a short simulated monitoring session and print the verdicts
    #[argh(switch, long = "monitor")]
    monitor: bool,

    /// host the monitor in per-request mode instead of whole-process mode
    #[argh(switch, long = "per-request")]
    per_request: bool,

    /// silence info-level logging
    #[argh(switch, short = 'q', long = "quiet")]
    quiet: bool,

    /// enable debug logging
    #[argh(switch, long = "debug")]
    debug: bool,
}

/// The demonstration program this binary drives the framework over:
///
/// ```text
/// def process(items):
///     total = 0                  # line 1
///     for item in items:         # line 2
///         total = total + item   # line 3
///         validate(total)        # line 4
///     return total                # line 5 (modeled as a plain statement)
/// ```
fn demo_function() -> Function {
    let total = Id::new("total");
    let item = Id::new("item");
    let items = Id::new("items");
    let validate = Id::new("validate");

    Function {
        name: Id::new("process"),
        body: vec![
            Stmt::Assign {
                targets: vec![Expr::Name(total)],
                value: Expr::Literal,
                loc: Location { line: 1 },
            },
            Stmt::For {
                target: Expr::Name(item),
                iter: Expr::Name(items),
                body: vec![
                    Stmt::Assign {
                        targets: vec![Expr::Name(total)],
                        value: Expr::Compound(vec![Expr::Name(total), Expr::Name(item)]),
                        loc: Location { line: 3 },
                    },
                    Stmt::Expr {
                        value: Expr::Call {
                            function: validate,
                            args: vec![Expr::Name(total)],
                        },
                        loc: Location { line: 4 },
                    },
                ],
                loc: Location { line: 2 },
            },
        ],
    }
}

/// "Whenever `total` changes, a `validate` call must follow within the same
/// binding before `total` changes again": `duration(total changes) < k`
/// keeps the demo specification small while still exercising a `Mixed`
/// atom end to end.
fn demo_specification() -> IcftlResult<Specification> {
    let process = Id::new("process");
    let t = Id::new("t");
    SpecificationBuilder::new()
        .forall(t, Predicate::changes(Id::new("total"), process))?
        .check(Expression::transition(t).duration().less_than(1.0)?)
}

fn build_function_map() -> AHashMap<Id, Scfg> {
    let function = demo_function();
    let mut map = AHashMap::default();
    map.insert(function.name, Scfg::build(&function));
    map
}

fn print_scfgs(function_to_scfg: &AHashMap<Id, Scfg>) {
    for (name, scfg) in function_to_scfg {
        println!("function {name}: {} symbolic states", scfg.len());
        for state in scfg.states() {
            let data = scfg.get(state);
            println!("  {state:?} -> {:?}", data.kind);
        }
    }
}

fn main() -> IcftlResult<()> {
    let opts: Opts = argh::from_env();
    env_logger::Builder::new()
        .filter_level(if opts.debug {
            log::LevelFilter::Debug
        } else if opts.quiet {
            log::LevelFilter::Error
        } else {
            log::LevelFilter::Info
        })
        .init();

    let function_to_scfg = build_function_map();
    let specification = demo_specification()?;

    if opts.print_scfg {
        print_scfgs(&function_to_scfg);
        return Ok(());
    }

    let analyser = Analyser::new(&specification, &function_to_scfg)?;
    let (bindings, tree) = analyser.compute_instrumentation_points()?;
    let atoms_owned = specification.constraint().get_atomic_constraints();
    let atoms: Vec<_> = atoms_owned.into_iter().collect();
    let points = plan(&bindings, &tree, &atoms, &function_to_scfg);

    if opts.print_plan || !opts.monitor {
        for point in &points {
            match point.kind {
                EmitKind::Binding {
                    binding_index,
                    variable_index,
                } => println!(
                    "{}:{} -> emit binding {binding_index}/{variable_index}",
                    point.function, point.line
                ),
                EmitKind::Measurement {
                    binding_index,
                    atom_index,
                    subatom_index,
                    measurement,
                } => println!(
                    "{}:{} -> emit measurement binding {binding_index} atom {atom_index}.{subatom_index} ({measurement:?})",
                    point.function, point.line
                ),
            }
        }
        if !opts.monitor {
            return Ok(());
        }
    }

    run_demo_monitoring_session(specification, opts.per_request, opts.quiet, opts.debug);
    Ok(())
}

/// Drives a short simulated monitoring session: sends triggers and
/// measurements as if the instrumentation plan above had fired them,
/// then prints the resulting verdicts. A real deployment would instead
/// wire [`Monitor::send_trigger`]/[`Monitor::send_measurement`] calls into
/// the sites the plan identifies via source rewriting.
fn run_demo_monitoring_session(specification: Specification, per_request: bool, quiet: bool, debug: bool) {
    let config = RuntimeConfig::builder()
        .hosting_mode(if per_request {
            HostingMode::PerRequest
        } else {
            HostingMode::WholeProcess
        })
        .logging(LoggingConfigDefaults {
            color: MonitorColorConfig::Auto,
            quiet,
            debug,
        })
        .build();

    let monitor = Monitor::start(specification, config);
    let t = Id::new("t");

    monitor.send_trigger(0, t).expect("monitor still running");
    monitor.send_measurement(0, 0, 0, 0.2).expect("monitor still running");
    monitor.send_measurement(0, 0, 1, 0.5).expect("monitor still running");

    let verdicts = monitor.end_monitoring().expect("monitor joined cleanly");
    for verdict in &verdicts {
        println!(
            "binding {} ({} timestamp(s)) -> {:?}",
            verdict.map_index,
            verdict.timestamps.len(),
            verdict.result()
        );
        #[cfg(feature = "serialize")]
        {
            let snapshot = icftl_monitor::VerdictSnapshot::from(verdict);
            if let Ok(json) = snapshot.to_json() {
                println!("  {json}");
            }
        }
    }
}

