// histoviz-cli: headless access to layouts, search, text extraction and data loading
// Build with: cargo build --features cli --bin histoviz-cli

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command};

use histoviz::graph_utils::graph::Graph;
use histoviz::graph_utils::seed::seed_graph;
use histoviz::interaction::search;
use histoviz::layout::{self, LayoutConfig, LayoutKind};
use histoviz::persistence::persist;
use histoviz::persistence::settings::AppSettings;
use histoviz::sources::{DataSources, GraphOutcome, Provenance};

fn input_arg() -> Arg {
    Arg::new("input")
        .short('i')
        .long("input")
        .value_name("FILE")
        .help("Graph JSON to read ('-' for stdin); defaults to the sample graph")
}

fn output_arg() -> Arg {
    Arg::new("output").short('o').long("output").value_name("FILE").help("Write graph JSON here instead of stdout")
}

fn offline_arg() -> Arg {
    Arg::new("offline").long("offline").action(ArgAction::SetTrue).help("Skip the graph synthesizer and use the local fallback")
}

fn cli() -> Command {
    Command::new("histoviz-cli")
        .about("HistoViz graph tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("layout")
                .about("Apply a layout and print the graph")
                .arg(Arg::new("kind").required(true).help("force | hierarchical | radial | timeline"))
                .arg(input_arg())
                .arg(output_arg())
                .arg(Arg::new("seed").long("seed").value_parser(clap::value_parser!(u64)).help("Seed for the force layout")),
        )
        .subcommand(
            Command::new("search")
                .about("List nodes whose label or description matches")
                .arg(Arg::new("query").required(true))
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("text")
                .about("Turn free text into a graph")
                .arg(Arg::new("file").short('f').long("file").value_name("FILE").help("Read text from a file ('-' for stdin)"))
                .arg(Arg::new("text").help("Text to visualize").conflicts_with("file"))
                .arg(offline_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("historical")
                .about("Build the timeline graph from the historical records")
                .arg(Arg::new("csv").long("csv").value_name("DIR").help("Directory with timelines.csv and timeline_events.csv"))
                .arg(offline_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a graph JSON file; optionally export its node table")
                .arg(Arg::new("file").required(true))
                .arg(Arg::new("csv").long("csv").value_name("FILE").help("Write the node table as CSV")),
        )
}

fn read_graph(path: Option<&String>) -> anyhow::Result<Graph> {
    match path.map(String::as_str) {
        None => Ok(seed_graph()),
        Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            persist::graph_from_json(&buf)
        }
        Some(p) => persist::import_graph_json(Path::new(p)),
    }
}

fn write_graph(graph: &Graph, output: Option<&String>) -> anyhow::Result<()> {
    match output {
        Some(p) => persist::export_graph_json(graph, Path::new(p)),
        None => {
            println!("{}", persist::graph_to_json(graph)?);
            Ok(())
        }
    }
}

fn report(outcome: &GraphOutcome) {
    match outcome.provenance {
        Provenance::Synthesized => eprintln!(
            "synthesized {} nodes, {} edges ({:?})",
            outcome.graph.node_count(),
            outcome.graph.edge_count(),
            outcome.coercion
        ),
        Provenance::Fallback => eprintln!(
            "fallback ({}): {} nodes, {} edges",
            outcome.fallback_reason.as_deref().unwrap_or("unknown"),
            outcome.graph.node_count(),
            outcome.graph.edge_count()
        ),
    }
}

fn sources_for(m: &ArgMatches, settings: &mut AppSettings) -> DataSources {
    if let Some(dir) = m.try_get_one::<String>("csv").ok().flatten() {
        settings.csv_store_dir = Some(PathBuf::from(dir));
    }
    let mut sources = DataSources::from_settings(settings);
    if m.get_flag("offline") {
        sources.synthesizer = None;
    }
    sources
}

fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("settings unreadable, using defaults: {:#}", e);
        AppSettings::default()
    });
    let config = LayoutConfig { seed: settings.layout_seed, ..Default::default() };

    match matches.subcommand() {
        Some(("layout", m)) => {
            let kind: LayoutKind = m.get_one::<String>("kind").ok_or_else(|| anyhow!("missing layout kind"))?.parse()?;
            let mut graph = read_graph(m.get_one::<String>("input"))?;
            let config = LayoutConfig { seed: m.get_one::<u64>("seed").copied().or(config.seed), ..config };
            let r = layout::apply_layout(&mut graph, kind, &config);
            eprintln!("{} layout: {} positioned, {} untouched", r.kind, r.positioned, r.untouched);
            write_graph(&graph, m.get_one::<String>("output"))
        }
        Some(("search", m)) => {
            let query = m.get_one::<String>("query").ok_or_else(|| anyhow!("missing query"))?;
            let mut graph = read_graph(m.get_one::<String>("input"))?;
            let outcome = search::highlight(&mut graph.nodes, query);
            for id in &outcome.matched {
                let label = graph.node(id).map(|n| n.data.label.as_str()).unwrap_or_default();
                println!("{}\t{}", id, label);
            }
            eprintln!("{} matched, {} dimmed", outcome.matched.len(), outcome.dimmed.len());
            Ok(())
        }
        Some(("text", m)) => {
            let text = match (m.get_one::<String>("file"), m.get_one::<String>("text")) {
                (Some(f), _) if f == "-" => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
                (Some(f), _) => std::fs::read_to_string(f).with_context(|| format!("reading {}", f))?,
                (None, Some(t)) => t.clone(),
                (None, None) => return Err(anyhow!("pass the text as an argument or with --file")),
            };
            let sources = sources_for(m, &mut settings);
            let outcome = sources.visualize_text(&text);
            report(&outcome);
            write_graph(&outcome.graph, m.get_one::<String>("output"))
        }
        Some(("historical", m)) => {
            let sources = sources_for(m, &mut settings);
            let outcome = sources.visualize_historical(&config)?;
            report(&outcome);
            write_graph(&outcome.graph, m.get_one::<String>("output"))
        }
        Some(("validate", m)) => {
            let file = m.get_one::<String>("file").ok_or_else(|| anyhow!("missing file"))?;
            let graph = persist::import_graph_json(Path::new(file))?;
            println!("ok: {} nodes, {} edges", graph.node_count(), graph.edge_count());
            if let Some(csv) = m.get_one::<String>("csv") {
                persist::export_nodes_csv(&graph, Path::new(csv))?;
                println!("node table written to {}", csv);
            }
            Ok(())
        }
        _ => Err(anyhow!("unknown command")),
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run(cli().get_matches()) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
