use serde::Deserialize;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{self, Stdio};
use walkdir::WalkDir;

fn main() {
    let args = libtest_mimic::Arguments::from_args();

    let tests = find_source_files("tests/input").map(extract_test).collect();

    libtest_mimic::run(&args, tests).exit();
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "kebab-case")]
struct Config {
    #[serde(default = "DEFAULT_IGNORE")]
    ignore: bool,
    /// Arguments to the command, with `{input}` standing for the test file.
    #[serde(default = "DEFAULT_ARGS")]
    args: Vec<String>,
    #[serde(default = "DEFAULT_EXIT_CODE")]
    exit_code: i32,
    /// Bytes written to stdin, as hexadecimal digits.
    #[serde(default)]
    stdin_hex: Option<String>,
    /// Fragments that must appear in the output.
    #[serde(default)]
    stdout: Vec<String>,
    #[serde(default)]
    stderr: Vec<String>,
    #[serde(default)]
    stdout_is: Option<String>,
}

const DEFAULT_IGNORE: fn() -> bool = || false;
const DEFAULT_ARGS: fn() -> Vec<String> = || vec!["check".to_owned(), "{input}".to_owned()];
const DEFAULT_EXIT_CODE: fn() -> i32 = || 0;

struct TestFailure {
    name: &'static str,
    details: Vec<(&'static str, String)>,
}

/// Recursively walk over test files under a file path.
fn find_source_files(root: impl AsRef<Path>) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| matches!(entry.path().extension(), Some(ext) if ext == "tl"))
        .map(|entry| entry.into_path())
}

fn extract_test(path: PathBuf) -> libtest_mimic::Trial {
    let config = read_config(&path);
    let ignored = matches!(&config, Ok(config) if config.ignore);
    libtest_mimic::Trial::test(path.display().to_string(), move || {
        let config = config.map_err(|error| failures_to_message(&[error]))?;
        match run_test(&path, &config) {
            failures if failures.is_empty() => Ok(()),
            failures => Err(failures_to_message(&failures).into()),
        }
    })
    .with_ignored_flag(ignored)
}

fn read_config(input_file: &Path) -> Result<Config, TestFailure> {
    use itertools::Itertools;

    const CONFIG_COMMENT_START: &str = "//~";

    let input_source = std::fs::read_to_string(input_file).map_err(|error| TestFailure {
        name: "unreadable input file",
        details: vec![("std::io::Error", error.to_string())],
    })?;
    // Collect the lines with CONFIG_COMMENT_START prefix, stripping the prefix in the process
    let config_source = input_source
        .lines()
        .filter_map(|line| line.split(CONFIG_COMMENT_START).nth(1))
        .join("\n");

    toml::from_str::<Config>(&config_source).map_err(|error| TestFailure {
        name: "config parse error",
        details: vec![("toml::de::Error", error.to_string())],
    })
}

fn run_test(input_file: &Path, config: &Config) -> Vec<TestFailure> {
    let mut failures = Vec::new();

    let stdin = match config.stdin_hex.as_deref().map(decode_hex).transpose() {
        Ok(stdin) => stdin,
        Err(message) => {
            failures.push(TestFailure {
                name: "invalid stdin-hex",
                details: vec![("message", message)],
            });
            return failures;
        }
    };

    let mut exe = process::Command::new(env!("CARGO_BIN_EXE_tlc"));
    exe.args(config.args.iter().map(|arg| match arg.as_str() {
        "{input}" => input_file.as_os_str().to_owned(),
        arg => arg.into(),
    }));
    exe.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let output = exe.spawn().and_then(|mut child| {
        if let Some(mut child_stdin) = child.stdin.take() {
            child_stdin.write_all(stdin.as_deref().unwrap_or(&[]))?;
        }
        child.wait_with_output()
    });
    let output = match output {
        Ok(output) => output,
        Err(error) => {
            failures.push(TestFailure {
                name: "unexpected command error",
                details: vec![("std::io::Error", error.to_string())],
            });
            return failures;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.code() != Some(config.exit_code) {
        failures.push(TestFailure {
            name: "unexpected exit status",
            details: vec![
                ("command", format!("{exe:?}")),
                ("status", output.status.to_string()),
                ("stderr", stderr.clone()),
            ],
        });
    }

    let missing_fragments = |name, output: &str, fragments: &[String]| {
        let missing = (fragments.iter())
            .filter(|fragment| !output.contains(fragment.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        (!missing.is_empty()).then(|| TestFailure {
            name,
            details: vec![("missing", missing.join("\n")), ("output", output.to_owned())],
        })
    };
    failures.extend(missing_fragments("stdout mismatch", &stdout, &config.stdout));
    failures.extend(missing_fragments("stderr mismatch", &stderr, &config.stderr));

    if let Some(expected) = &config.stdout_is {
        if *expected != stdout {
            failures.push(TestFailure {
                name: "stdout mismatch",
                details: vec![("expected", expected.clone()), ("found", stdout)],
            });
        }
    }

    failures
}

fn decode_hex(src: &str) -> Result<Vec<u8>, String> {
    let digits = src.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in `{src}`"));
    }
    (digits.chunks(2))
        .map(|pair| {
            let pair = pair.iter().collect::<String>();
            u8::from_str_radix(&pair, 16).map_err(|error| format!("`{pair}`: {error}"))
        })
        .collect()
}

fn failures_to_message(failures: &[TestFailure]) -> String {
    let mut msg = String::new();

    writeln!(msg).unwrap();
    for failure in failures {
        writeln!(msg, "    {}:", failure.name).unwrap();
        for (name, data) in &failure.details {
            writeln!(msg, "        ---- {name} ----").unwrap();
            for line in data.lines() {
                writeln!(msg, "        {line}").unwrap();
            }
        }
        writeln!(msg).unwrap();
    }
    writeln!(msg).unwrap();
    writeln!(msg, "    failures:").unwrap();
    for failure in failures {
        writeln!(msg, "        {}", failure.name).unwrap();
    }

    msg
}
