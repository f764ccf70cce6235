use crate::value::{Map, Value};

/// JSON formatting style.
#[derive(Clone, Copy)]
pub enum JsonStyle {
    /// Compact: no whitespace between tokens.
    Compact,
    /// Pretty: 2-space indented, one entry per line.
    Pretty,
}

struct JsonWriter {
    buf: String,
    style: JsonStyle,
    depth: usize,
}

impl JsonWriter {
    fn new(style: JsonStyle) -> Self {
        JsonWriter {
            buf: String::new(),
            style,
            depth: 0,
        }
    }

    fn is_pretty(&self) -> bool {
        matches!(self.style, JsonStyle::Pretty)
    }

    fn newline(&mut self) {
        if self.is_pretty() {
            self.buf.push('\n');
            for _ in 0..self.depth {
                self.buf.push_str("  ");
            }
        }
    }

    fn space(&mut self) {
        if self.is_pretty() {
            self.buf.push(' ');
        }
    }

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::None => self.buf.push_str("null"),
            Value::Bool(b) => self.buf.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => self.buf.push_str(&n.to_string()),
            Value::Float(x) => self.write_float(*x),
            Value::String(s) => self.write_string_value(s),
            Value::Array(items) => self.write_array(items),
            Value::Map(entries) => self.write_map(entries),
        }
    }

    fn write_float(&mut self, x: f64) {
        if x.is_finite() {
            // Debug formatting always keeps a '.' or an exponent, so the
            // number reads back as a float.
            self.buf.push_str(&format!("{:?}", x));
        } else {
            self.buf.push_str("null");
        }
    }

    fn write_array(&mut self, items: &[Value]) {
        self.buf.push('[');
        self.depth += 1;

        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.newline();
            self.write_value(item);
        }

        self.depth -= 1;
        if !items.is_empty() {
            self.newline();
        }
        self.buf.push(']');
    }

    fn write_map(&mut self, entries: &Map) {
        self.buf.push('{');
        self.depth += 1;

        let mut first = true;
        for (key, value) in entries {
            self.entry_sep(&mut first);
            self.write_key(key);
            self.write_value(value);
        }

        self.depth -= 1;
        if !entries.is_empty() {
            self.newline();
        }
        self.buf.push('}');
    }

    fn entry_sep(&mut self, first: &mut bool) {
        if *first {
            *first = false;
        } else {
            self.buf.push(',');
        }
        self.newline();
    }

    fn write_key(&mut self, key: &str) {
        self.write_string_value(key);
        self.buf.push(':');
        self.space();
    }

    fn write_string_value(&mut self, s: &str) {
        self.buf.push('"');
        for ch in s.chars() {
            match ch {
                '"' => self.buf.push_str("\\\""),
                '\\' => self.buf.push_str("\\\\"),
                '\n' => self.buf.push_str("\\n"),
                '\r' => self.buf.push_str("\\r"),
                '\t' => self.buf.push_str("\\t"),
                '\u{0008}' => self.buf.push_str("\\b"),
                '\u{000C}' => self.buf.push_str("\\f"),
                c if c < '\u{0020}' => self.buf.push_str(&format!("\\u{:04x}", c as u32)),
                c => self.buf.push(c),
            }
        }
        self.buf.push('"');
    }
}

/// Serialize a value to a compact JSON string (no whitespace).
pub fn to_json(value: &Value) -> String {
    let mut w = JsonWriter::new(JsonStyle::Compact);
    w.write_value(value);
    w.buf
}

/// Serialize a value to a pretty-printed JSON string (2-space indent).
pub fn to_json_pretty(value: &Value) -> String {
    let mut w = JsonWriter::new(JsonStyle::Pretty);
    w.write_value(value);
    w.buf
}

impl Value {
    /// Compact JSON. `none` and non-finite floats become `null`.
    ///
    /// The output is also valid OML source.
    pub fn to_json(&self) -> String {
        to_json(self)
    }

    /// Pretty-printed JSON (2-space indent).
    pub fn to_json_pretty(&self) -> String {
        to_json_pretty(self)
    }
}
