use std::io::Read;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use treepath::{CompileOptions, Error, Value};

const USAGE: &str = "\
Usage: tp <path> [--json TEXT | --file PATH] [operation] [options]

Operations (default: evaluate the path):
  --set VALUE      assign VALUE (JSON, or a bare string) and print the document
  --remove         remove the selection and print the document
  --add VALUE      append VALUE to the selected array (repeatable)
  --patch OPS      apply JSON patch operations (path argument optional)
  --size           print the size of the selection
  --keys           print the keys of the selected object
  --contains       print whether the path selects anything
  --paths          print every path below the selection

Options:
  --json TEXT      read the document from TEXT instead of stdin
  --file PATH      read the document from a file
  --stream         evaluate against the JSON text without building the tree
  --keep-nulls     keep nulls when a property maps over an array
  --pretty         pretty-print the output

Examples:
  tp '$.store.book[?(@.price < 10)].title' --file store.json
  echo '{\"a\":{\"b\":1}}' | tp '$.a.c' --set 2
  tp '$..price' --json '{\"x\":{\"price\":3}}' --stream";

enum Operation {
    Eval,
    Set(Value),
    Remove,
    Add(Vec<Value>),
    Patch(String),
    Size,
    Keys,
    Contains,
    Paths,
}

struct Args {
    path: Option<String>,
    json: Option<String>,
    file: Option<String>,
    operation: Operation,
    stream: bool,
    keep_nulls: bool,
    pretty: bool,
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!();
    eprintln!("{}", USAGE);
    process::exit(1);
}

/// Values on the command line are JSON when they parse, else plain strings.
fn parse_value(text: &str) -> Value {
    Value::parse(text).unwrap_or_else(|_| Value::from(text))
}

fn parse_args(args: &[String]) -> Args {
    let mut parsed = Args {
        path: None,
        json: None,
        file: None,
        operation: Operation::Eval,
        stream: false,
        keep_nulls: false,
        pretty: false,
    };
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let mut take_value = |flag: &str| -> String {
            i += 1;
            match args.get(i) {
                Some(value) => value.clone(),
                None => usage_error(&format!("{} requires an argument", flag)),
            }
        };
        match arg {
            "--json" => parsed.json = Some(take_value(arg)),
            "--file" => parsed.file = Some(take_value(arg)),
            "--set" => parsed.operation = Operation::Set(parse_value(&take_value(arg))),
            "--add" => {
                let value = parse_value(&take_value(arg));
                match &mut parsed.operation {
                    Operation::Add(values) => values.push(value),
                    _ => parsed.operation = Operation::Add(vec![value]),
                }
            }
            "--patch" => parsed.operation = Operation::Patch(take_value(arg)),
            "--remove" => parsed.operation = Operation::Remove,
            "--size" => parsed.operation = Operation::Size,
            "--keys" => parsed.operation = Operation::Keys,
            "--contains" => parsed.operation = Operation::Contains,
            "--paths" => parsed.operation = Operation::Paths,
            "--stream" => parsed.stream = true,
            "--keep-nulls" => parsed.keep_nulls = true,
            "--pretty" => parsed.pretty = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            flag if flag.starts_with("--") => usage_error(&format!("unknown option '{}'", flag)),
            path if parsed.path.is_none() => parsed.path = Some(path.to_string()),
            extra => usage_error(&format!("unexpected argument '{}'", extra)),
        }
        i += 1;
    }
    if parsed.json.is_some() && parsed.file.is_some() {
        usage_error("--json and --file are mutually exclusive");
    }
    if parsed.path.is_none() && !matches!(parsed.operation, Operation::Patch(_)) {
        usage_error("missing path");
    }
    if parsed.stream && !matches!(parsed.operation, Operation::Eval) {
        usage_error("--stream only supports evaluation");
    }
    parsed
}

fn read_input(args: &Args) -> String {
    let result = match (&args.json, &args.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(file)) => std::fs::read_to_string(file),
        (None, None) => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).map(|_| text)
        }
    };
    match result {
        Ok(text) => text,
        Err(e) => usage_error(&format!("cannot read input: {}", e)),
    }
}

fn run(args: &Args, input: &str) -> Result<Value, Error> {
    let options = CompileOptions {
        ignore_null_value: !args.keep_nulls,
    };
    let path = args.path.as_deref().unwrap_or("$");
    let compiled = treepath::compile_with(path, options)?;
    debug!(path = %compiled, segments = compiled.segments().len(), "compiled");

    if args.stream {
        return compiled.extract(input);
    }
    let mut root = Value::parse(input)?;
    match &args.operation {
        Operation::Eval => compiled.eval(&root),
        Operation::Set(value) => {
            compiled.set(&mut root, value.clone())?;
            Ok(root)
        }
        Operation::Remove => {
            compiled.remove(&mut root)?;
            Ok(root)
        }
        Operation::Add(values) => {
            compiled.array_add(&mut root, values)?;
            Ok(root)
        }
        Operation::Patch(ops) => treepath::patch_json(root, ops),
        Operation::Size => compiled.size(&root).map(Value::Integer),
        Operation::Keys => Ok(compiled
            .key_set(&root)?
            .map(|keys| Value::Array(keys.into_iter().map(Value::String).collect()))
            .unwrap_or_default()),
        Operation::Contains => compiled.contains(&root).map(Value::Boolean),
        Operation::Paths => {
            let selected = compiled.eval(&root)?;
            Ok(Value::Object(treepath::paths_of(&selected)))
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TREEPATH_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{}", USAGE);
        process::exit(1);
    }
    let args = parse_args(&args);
    let input = read_input(&args);

    let result = run(&args, &input).and_then(|value| {
        if args.pretty {
            value.to_json_string_pretty()
        } else {
            value.to_json_string()
        }
    });
    match result {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}
