use clap::Parser;
use std::path::PathBuf;

/// A compiler for TL binary schemas
#[derive(Parser)]
#[clap(author, version, about)]
enum Cli {
    /// Check that a schema is well formed
    Check {
        /// Path to the schema to check
        #[clap(name = "SCHEMA")]
        schema_file: PathOrStdin,
    },
    /// Generate code from a schema, printing it to stdout
    Compile {
        /// The code generator to use (see `tlc targets`)
        #[clap(long = "target", name = "NAME", display_order = 0)]
        target: String,
        /// Path to the schema to compile
        #[clap(name = "SCHEMA")]
        schema_file: PathOrStdin,
    },
    /// Decode binary data using the combinators of a schema
    #[clap(after_help = DATA_COMMAND_AFTER_HELP)]
    Data {
        /// Path to the schema describing the data
        #[clap(long = "schema", name = "SCHEMA", display_order = 0)]
        schema_file: PathOrStdin,
        /// Type of the data
        ///
        /// Boxed data, which starts with its combinator number, is read by default.
        #[clap(long = "type", name = "TYPE", display_order = 1)]
        type_name: Option<String>,
        /// Path to the binary data to read from
        #[clap(name = "BINARY_FILE")]
        binary_file: PathOrStdin,
    },
    /// List the available code generators
    Targets,
}

const DATA_COMMAND_AFTER_HELP: &str = "\
Examples:

  $ tlc data --schema telegram.tl response.bin
  $ tlc data --schema telegram.tl --type 'Vector<User>' users.bin
  $ tlc data --schema telegram.tl --type user user.bin
";

#[derive(Clone, Debug)]
enum PathOrStdin {
    StdIn,
    Path(PathBuf),
}

impl std::str::FromStr for PathOrStdin {
    type Err = std::convert::Infallible;

    fn from_str(src: &str) -> Result<PathOrStdin, std::convert::Infallible> {
        match src {
            "-" => Ok(PathOrStdin::StdIn),
            _ => Ok(PathOrStdin::Path(PathBuf::from(src))),
        }
    }
}

fn unwrap_or_exit<T>(option: Option<T>) -> T {
    option.unwrap_or_else(|| std::process::exit(tlc::Status::Error.exit_code()))
}

fn load_file_or_exit(driver: &mut tlc::Driver, file: PathOrStdin) -> tlc::source::FileId {
    unwrap_or_exit(match file {
        PathOrStdin::StdIn => driver.load_source("<stdin>".to_owned(), std::io::stdin()),
        PathOrStdin::Path(path) => driver.load_source_path(&path),
    })
}

fn read_bytes_or_exit(driver: &mut tlc::Driver, file: PathOrStdin) -> Vec<u8> {
    unwrap_or_exit(match file {
        PathOrStdin::StdIn => driver.read_bytes("<stdin>".to_owned(), std::io::stdin()),
        PathOrStdin::Path(path) => driver.read_bytes_path(&path),
    })
}

const MAX_PRETTY_WIDTH: usize = 80;

fn get_pretty_width() -> usize {
    let term_width = termsize::get().map_or(usize::MAX, |size| usize::from(size.cols));
    std::cmp::min(term_width, MAX_PRETTY_WIDTH)
}

fn main() -> ! {
    let mut driver = tlc::Driver::new();
    driver.install_panic_hook();
    driver.set_emit_width(get_pretty_width());

    let status = match Cli::parse() {
        Cli::Check { schema_file } => {
            let file_id = load_file_or_exit(&mut driver, schema_file);
            driver.check_schema(file_id)
        }
        Cli::Compile {
            target,
            schema_file,
        } => {
            let file_id = load_file_or_exit(&mut driver, schema_file);
            driver.compile_and_emit_schema(file_id, &target)
        }
        Cli::Data {
            schema_file,
            type_name,
            binary_file,
        } => {
            let file_id = load_file_or_exit(&mut driver, schema_file);
            let data = read_bytes_or_exit(&mut driver, binary_file);
            driver.read_and_emit_data(file_id, type_name.as_deref(), &data)
        }
        Cli::Targets => driver.emit_targets(),
    };

    std::process::exit(status.exit_code());
}
