use codespan_reporting::diagnostic::{Diagnostic, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::termcolor::{BufferedStandardStream, ColorChoice, WriteColor};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::path::Path;

use tlc_runtime::{ReadError, Reader};

use crate::binary;
use crate::ir::Schema;
use crate::pass::ir_to_pretty;
use crate::reporting::Message;
use crate::source::FileId;
use crate::target::{self, Target};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Error => 1,
        }
    }
}

fn color_choice(stream: atty::Stream) -> ColorChoice {
    match atty::is(stream) {
        true => ColorChoice::Auto,
        false => ColorChoice::Never,
    }
}

const DEFAULT_EMIT_WIDTH: usize = 80;

pub struct Driver {
    files: SimpleFiles<String, String>,

    seen_errors: RefCell<bool>,
    codespan_config: codespan_reporting::term::Config,
    diagnostic_writer: RefCell<Box<dyn WriteColor>>,

    emit_width: usize,
    emit_writer: RefCell<Box<dyn WriteColor>>,
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            files: SimpleFiles::new(),

            seen_errors: RefCell::new(false),
            codespan_config: codespan_reporting::term::Config::default(),
            diagnostic_writer: RefCell::new(Box::new(BufferedStandardStream::stderr(
                color_choice(atty::Stream::Stderr),
            ))),

            emit_width: DEFAULT_EMIT_WIDTH,
            emit_writer: RefCell::new(Box::new(BufferedStandardStream::stdout(color_choice(
                atty::Stream::Stdout,
            )))),
        }
    }

    /// Setup a global panic hook
    pub fn install_panic_hook(&self) {
        // Use the currently set codespan configuration
        let term_config = self.codespan_config.clone();
        // Fetch the default hook (which prints the panic message and an optional backtrace)
        let default_hook = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            let location = info.location();
            let message = if let Some(message) = info.payload().downcast_ref::<String>() {
                message.as_str()
            } else if let Some(message) = info.payload().downcast_ref::<&str>() {
                message
            } else {
                "unknown panic type"
            };

            let diagnostic = Diagnostic::bug()
                .with_message(format!("compiler panicked at '{message}'"))
                .with_notes(vec![match location {
                    Some(location) => format!("panicked at: {location}"),
                    None => "panicked at: unknown location".to_owned(),
                }]);

            let mut writer = BufferedStandardStream::stderr(color_choice(atty::Stream::Stderr));
            let dummy_files = SimpleFiles::<String, String>::new();

            default_hook(info);
            eprintln!();
            let _ =
                codespan_reporting::term::emit(&mut writer, &term_config, &dummy_files, &diagnostic);
            let _ = writer.flush();
        }));
    }

    /// Set the writer to use when rendering diagnostics
    pub fn set_diagnostic_writer(&mut self, stream: impl 'static + WriteColor) {
        self.diagnostic_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// Set the width to use when emitting pretty printed schemas and data
    pub fn set_emit_width(&mut self, emit_width: usize) {
        self.emit_width = emit_width;
    }

    /// Set the writer to use when emitting generated code and data
    pub fn set_emit_writer(&mut self, stream: impl 'static + WriteColor) {
        self.emit_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// Load a source string into the file database.
    pub fn load_source_string(&mut self, name: String, source: String) -> FileId {
        self.files.add(name, source)
    }

    /// Load a source file into the file database using a reader.
    pub fn load_source(&mut self, name: String, mut reader: impl Read) -> Option<FileId> {
        let mut source = String::new();
        match reader.read_to_string(&mut source) {
            Ok(_) if source.len() > crate::source::MAX_SOURCE_LEN => {
                let diagnostic = Diagnostic::error().with_message(format!(
                    "couldn't load `{name}`: schemas must be less than 4GiB in length"
                ));
                self.emit_diagnostic(diagnostic);
                None
            }
            Ok(_) => Some(self.load_source_string(name, source)),
            Err(error) => {
                self.emit_read_diagnostic(name, error);
                None
            }
        }
    }

    /// Load a source file into the file database from the given path.
    pub fn load_source_path(&mut self, path: &Path) -> Option<FileId> {
        match std::fs::File::open(path) {
            Ok(file) => self.load_source(path.display().to_string(), file),
            Err(error) => {
                self.emit_read_diagnostic(path.display(), error);
                None
            }
        }
    }

    /// Read all the bytes from a reader into a vector.
    pub fn read_bytes(&mut self, name: String, mut reader: impl Read) -> Option<Vec<u8>> {
        let mut bytes = Vec::new();
        match reader.read_to_end(&mut bytes) {
            Ok(_) => Some(bytes),
            Err(error) => {
                self.emit_read_diagnostic(name, error);
                None
            }
        }
    }

    /// Read all the bytes in a given file.
    pub fn read_bytes_path(&mut self, path: &Path) -> Option<Vec<u8>> {
        match std::fs::File::open(path) {
            Ok(file) => self.read_bytes(path.display().to_string(), file),
            Err(error) => {
                self.emit_read_diagnostic(path.display(), error);
                None
            }
        }
    }

    /// Build a schema, reporting any diagnostics.
    pub fn check_schema(&mut self, file_id: FileId) -> Status {
        match self.parse_schema(file_id) {
            Some(_) => Status::Ok,
            None => Status::Error,
        }
    }

    pub fn compile_and_emit_schema(&mut self, file_id: FileId, target_name: &str) -> Status {
        let target = match Target::from_name(target_name) {
            Ok(target) => target,
            Err(message) => {
                self.emit_diagnostic(message.to_diagnostic());
                return Status::Error;
            }
        };
        let schema = match self.parse_schema(file_id) {
            Some(schema) => schema,
            None => return Status::Error,
        };

        // Buffer the output so that nothing is emitted for a failed build
        let mut output = Vec::new();
        match target.emit(&schema, self.emit_width, &mut output) {
            Ok(()) => self.emit_bytes(&output),
            Err(target::Error::Compile(error)) => {
                let combinator = schema.combinator(error.combinator);
                let message = Message::UnsupportedDeclaration {
                    file_id,
                    range: combinator.range,
                    declaration: combinator.declaration(&schema),
                    param: error.param.map(|param| param.to_string()),
                    reason: error.reason.to_string(),
                };
                self.emit_diagnostic(message.to_diagnostic());
                Status::Error
            }
            Err(error @ target::Error::Io(_)) => {
                self.emit_diagnostic(Diagnostic::bug().with_message(error.to_string()));
                Status::Error
            }
        }
    }

    /// Decode binary data with a schema, printing the decoded value.
    ///
    /// Without a `type_name` the data must start with a combinator number.
    pub fn read_and_emit_data(
        &mut self,
        schema_file_id: FileId,
        type_name: Option<&str>,
        data: &[u8],
    ) -> Status {
        let schema = match self.parse_schema(schema_file_id) {
            Some(schema) => schema,
            None => return Status::Error,
        };

        let context = binary::Context::new(&schema);
        let mut reader = Reader::new(data);
        let value = match type_name {
            None => context.deserialize(&mut reader),
            Some(type_name) => (schema.shape_of_name(type_name))
                .map_err(binary::Error::from)
                .and_then(|shape| context.deserialize_shape(&mut reader, &shape)),
        };
        let value = match value {
            Ok(value) => value,
            Err(error) => {
                self.emit_diagnostic(binary_error_to_diagnostic(&error));
                return Status::Error;
            }
        };

        if !reader.is_empty() {
            let diagnostic = Diagnostic::warning()
                .with_message(format!("{} trailing bytes were not read", reader.remaining()))
                .with_notes(vec![format!("the value ended at offset {}", reader.offset())]);
            self.emit_diagnostic(diagnostic);
        }

        let arena = pretty::Arena::new();
        let doc = ir_to_pretty::from_value(&arena, &schema, &value).into_doc();
        self.emit_doc(doc)
    }

    /// List the available targets.
    pub fn emit_targets(&self) -> Status {
        let width = (Target::ALL.iter()).map(|target| target.name().len()).max().unwrap_or(0);
        let listing = (Target::ALL.iter())
            .map(|target| format!("{:width$}  {}\n", target.name(), target.description()))
            .collect::<String>();
        self.emit_bytes(listing.as_bytes())
    }

    fn parse_schema(&self, file_id: FileId) -> Option<Schema> {
        let source = match self.files.get(file_id) {
            Ok(file) => file.source(),
            Err(error) => {
                self.emit_diagnostic(Diagnostic::bug().with_message(error.to_string()));
                return None;
            }
        };

        let schema = Schema::parse(file_id, source, &mut |message| {
            self.emit_diagnostic(message.to_diagnostic());
        });
        match schema {
            Ok(schema) if !*self.seen_errors.borrow() => Some(schema),
            Ok(_) => None,
            Err(message) => {
                self.emit_diagnostic(message.to_diagnostic());
                None
            }
        }
    }

    fn emit_doc(&self, doc: pretty::RefDoc) -> Status {
        let output = format!("{}\n", doc.pretty(self.emit_width));
        self.emit_bytes(output.as_bytes())
    }

    fn emit_bytes(&self, bytes: &[u8]) -> Status {
        let mut emit_writer = self.emit_writer.borrow_mut();
        match emit_writer.write_all(bytes).and_then(|()| emit_writer.flush()) {
            Ok(()) => Status::Ok,
            Err(error) => {
                drop(emit_writer);
                let diagnostic =
                    Diagnostic::error().with_message(format!("couldn't write output: {error}"));
                self.emit_diagnostic(diagnostic);
                Status::Error
            }
        }
    }

    fn emit_diagnostic(&self, diagnostic: Diagnostic<FileId>) {
        let mut writer = self.diagnostic_writer.borrow_mut();
        let config = &self.codespan_config;

        // There is nowhere left to report a failure to write diagnostics
        let _ = codespan_reporting::term::emit(&mut *writer, config, &self.files, &diagnostic);
        let _ = writer.flush();

        if diagnostic.severity >= Severity::Error {
            *self.seen_errors.borrow_mut() = true;
        }
    }

    fn emit_read_diagnostic(&self, name: impl std::fmt::Display, error: std::io::Error) {
        let diagnostic =
            Diagnostic::error().with_message(format!("couldn't read `{name}`: {error}"));
        self.emit_diagnostic(diagnostic);
    }
}

impl Default for Driver {
    fn default() -> Driver {
        Driver::new()
    }
}

fn binary_error_to_diagnostic(error: &binary::Error) -> Diagnostic<FileId> {
    let notes = match error {
        binary::Error::Read(ReadError::TruncatedStream { .. }) => {
            vec!["the data ended before the value was complete".to_owned()]
        }
        binary::Error::Read(ReadError::UnknownDiscriminant { .. }) => {
            vec!["no combinator of the schema has this number".to_owned()]
        }
        binary::Error::Read(ReadError::InvalidLengthPrefix { .. }) => {
            vec!["`0xff` is not a valid string or bytes length prefix".to_owned()]
        }
        binary::Error::Shape(_) => vec![
            "`--type` accepts a type or constructor of the schema, eg. `Vector<int>`".to_owned(),
        ],
        _ => Vec::new(),
    };
    Diagnostic::error()
        .with_message(format!("couldn't read data: {error}"))
        .with_notes(notes)
}

#[cfg(test)]
mod tests {
    use codespan_reporting::term::termcolor::NoColor;
    use std::rc::Rc;

    use super::*;

    /// A writer that can be inspected after the driver takes ownership of it.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn driver() -> (Driver, SharedBuffer, SharedBuffer) {
        let emitted = SharedBuffer::default();
        let diagnostics = SharedBuffer::default();
        let mut driver = Driver::new();
        driver.set_emit_writer(NoColor::new(emitted.clone()));
        driver.set_diagnostic_writer(NoColor::new(diagnostics.clone()));
        (driver, emitted, diagnostics)
    }

    #[test]
    fn duplicate_number_emits_nothing() {
        let (mut driver, emitted, diagnostics) = driver();
        let file_id = driver.load_source_string(
            "schema.tl".to_owned(),
            "a#aabbccdd = A;\nb#aabbccdd = B;\n".to_owned(),
        );
        assert_eq!(driver.compile_and_emit_schema(file_id, "rust"), Status::Error);
        assert_eq!(emitted.contents(), "");
        assert!(diagnostics.contents().contains("duplicate combinator number `#aabbccdd`"));
    }

    #[test]
    fn types_marker_warning_does_not_fail() {
        let (mut driver, _, diagnostics) = driver();
        let file_id = driver.load_source_string(
            "schema.tl".to_owned(),
            "---types---\nuser#d23c81a3 id:int = User;\n".to_owned(),
        );
        assert_eq!(driver.check_schema(file_id), Status::Ok);
        assert!(diagnostics.contents().contains("warning"));
    }

    #[test]
    fn data_is_printed() {
        let (mut driver, emitted, _) = driver();
        let file_id = driver.load_source_string(
            "schema.tl".to_owned(),
            "user#d23c81a3 id:int name:string = User;\n".to_owned(),
        );
        let data = [
            0xa3, 0x81, 0x3c, 0xd2, // user
            0x01, 0x00, 0x00, 0x00, // id
            0x05, 0x50, 0x65, 0x74, 0x65, 0x72, 0x00, 0x00, // name
        ];
        assert_eq!(driver.read_and_emit_data(file_id, None, &data), Status::Ok);
        assert_eq!(emitted.contents(), "user { id = 1, name = \"Peter\" }\n");
    }

    #[test]
    fn data_with_type() {
        let (mut driver, emitted, _) = driver();
        let file_id = driver.load_source_string("schema.tl".to_owned(), String::new());
        let data = [0x15, 0xc4, 0xb5, 0x1c, 0x01, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00];
        let status = driver.read_and_emit_data(file_id, Some("Vector<int>"), &data);
        assert_eq!(status, Status::Ok);
        assert_eq!(emitted.contents(), "[10]\n");
    }

    #[test]
    fn truncated_data() {
        let (mut driver, emitted, diagnostics) = driver();
        let file_id = driver.load_source_string(
            "schema.tl".to_owned(),
            "user#d23c81a3 id:int = User;\n".to_owned(),
        );
        let data = [0xa3, 0x81, 0x3c, 0xd2, 0x01];
        assert_eq!(driver.read_and_emit_data(file_id, None, &data), Status::Error);
        assert_eq!(emitted.contents(), "");
        assert!(diagnostics.contents().contains("the data ended before the value was complete"));
    }

    #[test]
    fn targets_are_listed() {
        let (driver, emitted, _) = driver();
        assert_eq!(driver.emit_targets(), Status::Ok);
        assert!(emitted.contents().starts_with("rust  Rust bindings"));
        assert!(emitted.contents().contains("\ntl    the schema"));
    }
}
