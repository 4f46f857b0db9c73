use pretty::{DocAllocator, DocBuilder};

use crate::binary::Value;
use crate::ir::{Combinator, CombinatorId, Schema};

const INDENT: isize = 4;

/// Print a schema in TL syntax, constructors first.
///
/// Built-ins are only printed if the source restated them.
pub fn from_schema<'a, D>(alloc: &'a D, schema: &'a Schema) -> DocBuilder<'a, D>
where
    D: DocAllocator<'a>,
    D::Doc: Clone,
{
    let is_printed = |combinator: &Combinator| {
        schema.builtin(combinator).is_none() || combinator.range.is_some()
    };
    let line = |(_, combinator): (CombinatorId, &'a Combinator)| {
        from_combinator(alloc, schema, combinator).append(alloc.hardline())
    };
    let constructors = (schema.constructors())
        .filter(|(_, combinator)| is_printed(*combinator))
        .map(line)
        .collect::<Vec<_>>();
    let functions = schema.functions().map(line).collect::<Vec<_>>();
    let separator = |docs: &[DocBuilder<'a, D>]| match docs.is_empty() {
        true => alloc.nil(),
        false => alloc.hardline(),
    };
    let constructors_end = separator(&constructors);
    let functions_start = separator(&functions);

    (alloc.nil())
        .append(alloc.concat(constructors))
        .append(constructors_end)
        .append("---functions---")
        .append(alloc.hardline())
        .append(functions_start)
        .append(alloc.concat(functions))
}

pub fn from_combinator<'a, D>(
    alloc: &'a D,
    schema: &'a Schema,
    combinator: &'a Combinator,
) -> DocBuilder<'a, D>
where
    D: DocAllocator<'a>,
    D::Doc: Clone,
{
    let head = format!("{}#{:08x}", combinator.identifier, combinator.number);
    let marker = schema.builtin(combinator).map(|_| alloc.line().append("?"));
    let params = (combinator.params.iter())
        .map(|param| alloc.line().append(alloc.text(schema.param_text(param))));

    (alloc.nil())
        .append(alloc.text(head))
        .append(alloc.concat(marker.into_iter().chain(params)).nest(INDENT))
        .group()
        .append(alloc.space())
        .append("=")
        .append(alloc.space())
        .append(alloc.text(schema.type_name(combinator.result_type)))
        .append(";")
}

/// Print a decoded value, naming objects by their combinator.
pub fn from_value<'a, D>(alloc: &'a D, schema: &'a Schema, value: &'a Value) -> DocBuilder<'a, D>
where
    D: DocAllocator<'a>,
    D::Doc: Clone,
{
    match value {
        Value::Nat(nat) => alloc.as_string(nat),
        Value::Int(int) => alloc.as_string(int),
        Value::Long(long) => alloc.as_string(long),
        Value::Double(double) => alloc.text(format!("{double:?}")),
        Value::String(string) => alloc.text(format!("{string:?}")),
        Value::Bytes(bytes) => {
            let escaped = bytes
                .iter()
                .flat_map(|byte| std::ascii::escape_default(*byte))
                .map(char::from)
                .collect::<String>();
            alloc.text(format!("b\"{escaped}\""))
        }
        Value::Vector(elems) => sequence(
            alloc,
            ("[", "]"),
            alloc.line_(),
            elems.iter().map(|elem| from_value(alloc, schema, elem)),
        ),
        Value::Object { number, fields } => {
            let name = match schema.combinator_by_number(*number) {
                Some(id) => schema.combinator(id).identifier.to_string(),
                None => format!("#{number:08x}"),
            };
            if fields.is_empty() {
                return alloc.text(name);
            }
            let fields = fields.iter().map(|(label, value)| {
                (alloc.nil())
                    .append(alloc.text(label.resolve()))
                    .append(alloc.space())
                    .append("=")
                    .group()
                    .append(alloc.space().append(from_value(alloc, schema, value)).nest(INDENT))
            });
            (alloc.nil())
                .append(alloc.text(name))
                .append(alloc.space())
                .append(sequence(alloc, ("{", "}"), alloc.line(), fields))
        }
    }
}

/// `padding` separates the delimiters from the elements.
fn sequence<'a, D>(
    alloc: &'a D,
    (start, end): (&'static str, &'static str),
    padding: DocBuilder<'a, D>,
    docs: impl Iterator<Item = DocBuilder<'a, D>>,
) -> DocBuilder<'a, D>
where
    D: DocAllocator<'a>,
    D::Doc: Clone,
{
    let separator = alloc.text(",").append(alloc.line());
    (alloc.nil())
        .append(start)
        .append(
            (padding.clone())
                .append(alloc.intersperse(docs, separator))
                .nest(INDENT),
        )
        .append(padding)
        .append(end)
        .group()
}
