//! Command line driver of the USCP solver

use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::{load_yaml, App, ArgMatches};
use fastrand::Rng;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use uscp::greedy;
use uscp::instance::{self, Instance};
use uscp::instances;
use uscp::memetic::{self, MemeticConfig, MemeticPosition};
use uscp::reduction;
use uscp::rwls::{Position, Rwls, RwlsReport};

/// RWLS budget of one memetic improvement call; the cumulative budget
/// given on the command line bounds the whole run
const MEMETIC_RWLS_STEPS_PER_CALL: usize = 100_000;

/// solving options gathered from the command line
struct ProgramOptions {
    output_prefix: String,
    repetitions: usize,
    reduce: bool,
    greedy: bool,
    rwls: bool,
    rwls_stop: Position,
    memetic: bool,
    memetic_config: MemeticConfig,
    memetic_crossover: String,
    memetic_wcrossover: String,
}

/// parses an optional numeric argument, keeping `default` when absent
fn parse_arg<T: FromStr>(matches: &ArgMatches, name: &str, default: T) -> anyhow::Result<T> {
    match matches.value_of(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("unable to parse --{} value {:?}", name, raw)),
    }
}

fn read_options(matches: &ArgMatches) -> anyhow::Result<ProgramOptions> {
    Ok(ProgramOptions {
        output_prefix: matches.value_of("output_prefix").unwrap_or("solver_out_").to_string(),
        repetitions: parse_arg(matches, "repetitions", 1)?,
        reduce: matches.is_present("reduce"),
        greedy: matches.is_present("greedy"),
        rwls: matches.is_present("rwls"),
        rwls_stop: Position {
            steps: parse_arg(matches, "rwls_steps", usize::MAX)?,
            time: parse_arg(matches, "rwls_time", f64::MAX)?,
        },
        memetic: matches.is_present("memetic"),
        memetic_config: MemeticConfig {
            stopping_criterion: MemeticPosition {
                generation: usize::MAX,
                rwls_cumulative_position: Position {
                    steps: parse_arg(matches, "memetic_cumulative_rwls_steps", usize::MAX)?,
                    time: parse_arg(matches, "memetic_cumulative_rwls_time", f64::MAX)?,
                },
                time: parse_arg(matches, "memetic_time", f64::MAX)?,
            },
            rwls_stopping_criterion: Position {
                steps: MEMETIC_RWLS_STEPS_PER_CALL,
                time: f64::MAX,
            },
        },
        memetic_crossover: matches.value_of("memetic_crossover").unwrap_or("identity").to_string(),
        memetic_wcrossover: matches.value_of("memetic_wcrossover").unwrap_or("reset").to_string(),
    })
}

/// solves one instance with the requested algorithms, returns its JSON record
fn process_instance(
    options: &ProgramOptions,
    rng: &mut Rng,
    instance_base: Rc<Instance>,
) -> anyhow::Result<serde_json::Value> {
    if !instance::has_solution(&instance_base) {
        bail!("instance {} has no solution", instance_base.name());
    }

    let working_instance = if options.reduce {
        reduction::reduce(&instance_base)
    } else {
        Rc::clone(&instance_base)
    };

    let mut data_instance = json!({ "instance": instance_base.serialize() });

    let export_greedy = |report: &greedy::GreedyReport| -> anyhow::Result<serde_json::Value> {
        if options.reduce {
            let expanded = greedy::expand(report)?;
            if !expanded.solution_final.cover_all_points {
                bail!("expanded greedy solution doesn't cover all points");
            }
            info!(
                "({}) Greedy found solution with {} subsets",
                instance_base.name(),
                expanded.solution_final.selected_subsets.count()
            );
            Ok(serde_json::to_value(expanded.serialize())?)
        } else {
            info!(
                "({}) Greedy found solution with {} subsets",
                instance_base.name(),
                report.solution_final.selected_subsets.count()
            );
            Ok(serde_json::to_value(report.serialize())?)
        }
    };

    if options.greedy && !options.rwls {
        let greedy_report = greedy::solve_report(&working_instance)?;
        data_instance["greedy"] = export_greedy(&greedy_report)?;
    }

    if options.rwls {
        let greedy_report = greedy::solve_report(&working_instance)?;
        if options.greedy {
            data_instance["greedy"] = export_greedy(&greedy_report)?;
        }
        let mut data_rwls = Vec::new();
        let mut rwls_engine = Rwls::new(Rc::clone(&working_instance));
        rwls_engine.initialize();
        for _ in 0..options.repetitions {
            let mut report = RwlsReport::new(Rc::clone(&working_instance));
            report.solution_initial = greedy_report.solution_final.clone();
            report.solution_final = greedy_report.solution_final.clone();
            report.found_at =
                rwls_engine.improve(&mut report.solution_final, rng, options.rwls_stop);
            let exported = if options.reduce {
                let expanded = uscp::rwls::expand(&report)?;
                if !expanded.solution_final.cover_all_points {
                    bail!("expanded RWLS solution doesn't cover all points");
                }
                expanded
            } else {
                report
            };
            info!(
                "({}) RWLS improved solution from {} subsets to {} subsets",
                instance_base.name(),
                exported.solution_initial.selected_subsets.count(),
                exported.solution_final.selected_subsets.count()
            );
            data_rwls.push(serde_json::to_value(exported.serialize())?);
        }
        data_instance["rwls"] = serde_json::Value::Array(data_rwls);
    }

    if options.memetic {
        let mut data_memetic = Vec::new();
        for _ in 0..options.repetitions {
            let report = memetic::solve(
                &working_instance,
                &options.memetic_crossover,
                &options.memetic_wcrossover,
                rng,
                &options.memetic_config,
            )?;
            let exported = if options.reduce {
                let expanded = memetic::expand(&report)?;
                if !expanded.solution_final.cover_all_points {
                    bail!("expanded memetic solution doesn't cover all points");
                }
                expanded
            } else {
                report
            };
            info!(
                "({}) Memetic found solution with {} subsets",
                instance_base.name(),
                exported.solution_final.selected_subsets.count()
            );
            data_memetic.push(serde_json::to_value(exported.serialize())?);
        }
        data_instance["memetic"] = serde_json::Value::Array(data_memetic);
    }

    Ok(data_instance)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let yaml = load_yaml!("main_args.yml");
    let matches = App::from_yaml(yaml).get_matches();
    let options = read_options(&matches)?;

    let registered_names: Vec<String> = matches
        .values_of("instances")
        .map(|values| values.map(str::to_string).collect())
        .unwrap_or_default();
    let instance_type = matches.value_of("instance_type");
    let instance_path = matches.value_of("instance_path");
    let instance_name = matches.value_of("instance_name");
    let has_unknown_instance =
        instance_type.is_some() || instance_path.is_some() || instance_name.is_some();

    if registered_names.is_empty() && !has_unknown_instance {
        println!("No instances specified, nothing to do");
        return Ok(());
    }
    if !options.greedy && !options.rwls && !options.memetic {
        println!("No algorithm specified, nothing to do");
        return Ok(());
    }
    if options.repetitions == 0 {
        println!("0 repetitions, nothing to do");
        return Ok(());
    }

    let seed = match matches.value_of("seed") {
        Some(raw) => raw.parse::<u64>().context("unable to parse the seed given")?,
        None => Rng::new().u64(..),
    };
    info!("START (seed {})", seed);
    let mut rng = Rng::with_seed(seed);

    let mut data_instances = Vec::new();
    for name in &registered_names {
        let instance_info = instances::by_name(name)
            .with_context(|| format!("no registered instance named {} exist", name))?;
        let instance_base = Rc::new(instances::read_registered(instance_info)?);
        data_instances.push(process_instance(&options, &mut rng, instance_base)?);
    }

    if has_unknown_instance {
        let kind = instance_type.context("no instance type given")?;
        let path = instance_path.context("no instance path given")?;
        let name = instance_name.context("no instance name given")?;
        let instance_base = Rc::new(instances::read_unknown(kind, Path::new(path), name)?);
        data_instances.push(process_instance(&options, &mut rng, instance_base)?);
    }

    let date = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let data = json!({
        "date": date,
        "seed": seed,
        "instances": data_instances,
    });

    let output_file = format!("{}{}_{}.json", options.output_prefix, date, rng.u64(..));
    std::fs::write(&output_file, serde_json::to_string_pretty(&data)?)
        .with_context(|| format!("failed to write file {}", output_file))?;
    info!("Results written to {}", output_file);

    info!("END");
    Ok(())
}

/// keep the parsing helpers honest
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_default_and_value() {
        let yaml = load_yaml!("main_args.yml");
        let matches = App::from_yaml(yaml)
            .get_matches_from(vec!["uscp", "--rwls", "--rwls_steps=5000"]);
        assert_eq!(parse_arg(&matches, "rwls_steps", usize::MAX).unwrap(), 5000);
        assert_eq!(parse_arg(&matches, "rwls_time", f64::MAX).unwrap(), f64::MAX);
        let options = read_options(&matches).unwrap();
        assert!(options.rwls && !options.greedy && !options.memetic);
        assert_eq!(options.rwls_stop.steps, 5000);
    }

    #[test]
    fn test_instances_are_comma_separated() {
        let yaml = load_yaml!("main_args.yml");
        let matches = App::from_yaml(yaml)
            .get_matches_from(vec!["uscp", "--instances=CYC6,CYC7", "--greedy"]);
        let names: Vec<&str> = matches.values_of("instances").unwrap().collect();
        assert_eq!(names, vec!["CYC6", "CYC7"]);
    }
}
