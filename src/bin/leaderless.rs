use std::process;
use std::time::Duration;

use clap::{App, Arg, ArgMatches};

use epaxos::conf::ClusterConf;
use leaderless::runner::run;
use leaderless::runner::Protocol;
use leaderless::runner::RunError;
use leaderless::runner::Workload;
use leaderless::setup::init_logger;

fn main() {
    let matches = App::new("leaderless")
        .version("0.1.0")
        .author("openacid")
        .about("run a workload through an in-process epaxos or copilot cluster")
        .arg(
            Arg::with_name("conf")
                .long("conf")
                .takes_value(true)
                .help("cluster config in yaml. A local group of 3 replicas if absent"),
        )
        .arg(
            Arg::with_name("protocol")
                .long("protocol")
                .takes_value(true)
                .default_value("epaxos")
                .possible_values(&["epaxos", "copilot"]),
        )
        .arg(
            Arg::with_name("requests")
                .long("requests")
                .takes_value(true)
                .default_value("1000"),
        )
        .arg(
            Arg::with_name("concurrent")
                .long("concurrent")
                .takes_value(true)
                .default_value("10")
                .help("number of proposals in flight"),
        )
        .arg(
            Arg::with_name("conflict")
                .long("conflict")
                .takes_value(true)
                .default_value("0")
                .help("percentage of commands sharing one key"),
        )
        .arg(
            Arg::with_name("log-file")
                .long("log-file")
                .takes_value(true)
                .default_value("leaderless.log"),
        )
        .arg(
            Arg::with_name("log-level")
                .long("log-level")
                .takes_value(true)
                .default_value("info"),
        )
        .get_matches();

    if let Err(e) = start(&matches) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

#[tokio::main]
async fn start(matches: &ArgMatches<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let logger = init_logger(
        matches.value_of("log-file").unwrap_or("leaderless.log"),
        matches.value_of("log-level").unwrap_or("info"),
    )?;

    let conf = match matches.value_of("conf") {
        Some(path) => ClusterConf::from_file(path).map_err(RunError::from)?,
        None => ClusterConf::new_local(3),
    };

    let protocol: Protocol = matches.value_of("protocol").unwrap_or("epaxos").parse()?;

    let workload = Workload {
        requests: number(matches, "requests")?,
        concurrent: number(matches, "concurrent")?,
        conflict: number(matches, "conflict")?,
        apply_timeout: Duration::from_secs(30),
    };

    let report = run(protocol, conf, &workload, &logger).await?;
    println!("{}", report);

    Ok(())
}

fn number<T: std::str::FromStr>(matches: &ArgMatches<'_>, name: &str) -> Result<T, RunError> {
    let v = matches.value_of(name).unwrap_or("0");
    v.parse()
        .map_err(|_| RunError::BadWorkload(format!("--{}: not a number: {}", name, v)))
}
