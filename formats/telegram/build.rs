use std::env;
use std::fs::File;
use std::path::PathBuf;

use tlc::ir::Schema;
use tlc::target::Target;

const SCHEMA_PATH: &str = "src/telegram.tl";

fn main() {
    println!("cargo:rerun-if-changed={SCHEMA_PATH}");

    let source = std::fs::read_to_string(SCHEMA_PATH).unwrap();
    let schema = Schema::parse(0, &source, &mut |message| {
        println!("cargo:warning={message:?}");
    })
    .unwrap_or_else(|message| panic!("{SCHEMA_PATH}: {message:?}"));

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap()).join("telegram.rs");
    let mut file = File::create(out_path).unwrap();
    Target::Rust.emit(&schema, 80, &mut file).unwrap();
}
