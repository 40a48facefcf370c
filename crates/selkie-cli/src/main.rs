use futures::executor::block_on;
use selkie_render::{Direction, GraphInput, LayoutResult, RenderOptions};
use serde_json::Value;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Render(selkie_render::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Config(String),
    Strict(selkie_render::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Yaml(err) => write!(f, "YAML error: {err}"),
            CliError::Config(msg) => write!(f, "config error: {msg}"),
            CliError::Strict(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<selkie_render::Error> for CliError {
    fn from(value: selkie_render::Error) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Yaml(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Config,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    config: Option<String>,
    direction: Option<Direction>,
    pretty: bool,
    strict: bool,
    out: Option<String>,
}

fn usage() -> &'static str {
    "selkie\n\
\n\
USAGE:\n\
  selkie [layout] [--config <file.json|file.yaml>] [--direction TB|BT|LR|RL] [--pretty] [--strict] [-o <path>] [<path>|-]\n\
  selkie config [--config <file.json|file.yaml>] [--direction TB|BT|LR|RL] [--pretty] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the graph JSON is read from stdin.\n\
  - layout prints the layout result as JSON; use -o/--out to write a file.\n\
  - config prints the effective layout configuration without laying anything out.\n\
  - --config values override the graph's own `config`; --direction overrides both.\n\
  - --strict exits with code 3 when any node or edge failed to render.\n\
  - Set RUST_LOG (e.g. RUST_LOG=selkie_render=debug) for diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" if args.input.is_none() => args.command = Command::Layout,
            "config" if args.input.is_none() => args.command = Command::Config,
            "--pretty" => args.pretty = true,
            "--strict" => args.strict = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--direction" => {
                let Some(dir) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.direction = Some(
                    dir.parse::<Direction>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "-o" | "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" if args.input.is_none() => args.input = Some("-".to_string()),
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

/// Reads a config override file. YAML is a superset of JSON, so `.json` files only take the
/// stricter parser to get JSON error messages.
fn read_config_file(path: &str) -> Result<Value, CliError> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = if path.ends_with(".json") {
        serde_json::from_str(&text)?
    } else {
        serde_yaml::from_str(&text)?
    };
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Default::default())),
        _ => Err(CliError::Config(format!(
            "`{path}` must contain a mapping of layout options"
        ))),
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Parses the graph document and applies the `--config` file and `--direction` flag on top of its
/// own `config` section.
fn load_graph(text: &str, args: &Args) -> Result<GraphInput, CliError> {
    let mut doc: Value = serde_json::from_str(text)?;
    let Value::Object(map) = &mut doc else {
        return Err(CliError::Config("graph input must be a JSON object".to_string()));
    };

    let mut config = map
        .remove("config")
        .unwrap_or_else(|| Value::Object(Default::default()));
    if let Some(path) = args.config.as_deref() {
        tracing::debug!(path, "applying config file");
        merge_values(&mut config, read_config_file(path)?);
    }
    map.insert("config".to_string(), config);

    let mut input: GraphInput = serde_json::from_value(doc)?;
    if let Some(direction) = args.direction {
        input.config.direction = direction;
    }
    input.config.validate()?;
    Ok(input)
}

fn write_json(value: &impl serde::Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let input = load_graph(&text, &args)?;

    match args.command {
        Command::Config => write_json(&input.config, args.pretty, args.out.as_deref()),
        Command::Layout => {
            let options = RenderOptions::for_config(&input.config);
            let result: LayoutResult = block_on(selkie_render::render(&input, &options))?;
            tracing::debug!(
                nodes = result.nodes.len(),
                edges = result.edges.len(),
                clusters = result.clusters.len(),
                failures = result.failures.len(),
                "layout finished"
            );
            for failure in &result.failures {
                eprintln!("warning: {failure}");
            }
            let result = if args.strict {
                result.into_strict().map_err(CliError::Strict)?
            } else {
                result
            };
            write_json(&result, args.pretty, args.out.as_deref())
        }
    }
}

fn main() {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::Strict(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        std::iter::once("selkie")
            .chain(items.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_flags_and_input() {
        let args = parse_args(&argv(&[
            "layout",
            "--pretty",
            "--direction",
            "lr",
            "-o",
            "out.json",
            "graph.json",
        ]))
        .unwrap();
        assert!(matches!(args.command, Command::Layout));
        assert!(args.pretty);
        assert_eq!(args.direction, Some(Direction::LR));
        assert_eq!(args.out.as_deref(), Some("out.json"));
        assert_eq!(args.input.as_deref(), Some("graph.json"));
    }

    #[test]
    fn rejects_unknown_flags_and_bad_directions() {
        assert!(matches!(
            parse_args(&argv(&["--nope"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&argv(&["--direction", "up"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&argv(&["a.json", "b.json"])),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn config_overlay_merges_nested_objects() {
        let mut base = serde_json::json!({
            "rankSpacing": 40,
            "subGraphTitleMargin": { "top": 4, "bottom": 2 }
        });
        merge_values(
            &mut base,
            serde_json::json!({ "subGraphTitleMargin": { "top": 10 }, "nodeSpacing": 30 }),
        );
        assert_eq!(
            base,
            serde_json::json!({
                "rankSpacing": 40,
                "subGraphTitleMargin": { "top": 10, "bottom": 2 },
                "nodeSpacing": 30
            })
        );
    }

    #[test]
    fn direction_flag_overrides_graph_config() {
        let args = Args {
            direction: Some(Direction::RL),
            ..Default::default()
        };
        let input = load_graph(
            r#"{"nodes":[{"id":"a"}],"config":{"direction":"TB","rankSpacing":30}}"#,
            &args,
        )
        .unwrap();
        assert_eq!(input.config.direction, Direction::RL);
        assert_eq!(input.config.rank_spacing, 30.0);
    }

    #[test]
    fn load_graph_rejects_invalid_config_values() {
        let err = load_graph(
            r#"{"nodes":[],"config":{"nodeSpacing":-1}}"#,
            &Args::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Render(selkie_render::Error::InvalidConfig { .. })));
    }
}
