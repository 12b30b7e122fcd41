// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use owo_colors::Style;
use serde::Serialize;
use std::io;

/// Output formats for lists and run results.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum OutputFormat {
    /// A human-readable output format.
    Human {
        /// Whether to produce verbose output.
        verbose: bool,
    },

    /// Machine-readable output format.
    Serializable(SerializableFormat),
}

/// A serialized, machine-readable output format.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SerializableFormat {
    /// JSON with no whitespace.
    Json,
    /// JSON, prettified.
    JsonPretty,
}

impl SerializableFormat {
    /// Write this data in the given format to the writer.
    pub fn to_writer(
        self,
        value: &impl Serialize,
        writer: impl io::Write,
    ) -> serde_json::Result<()> {
        match self {
            SerializableFormat::Json => serde_json::to_writer(writer, value),
            SerializableFormat::JsonPretty => serde_json::to_writer_pretty(writer, value),
        }
    }

    /// Serializes this data to a string.
    pub fn to_string(self, value: &impl Serialize) -> serde_json::Result<String> {
        match self {
            SerializableFormat::Json => serde_json::to_string(value),
            SerializableFormat::JsonPretty => serde_json::to_string_pretty(value),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Styles {
    pub(crate) suite: Style,
    pub(crate) file: Style,
    pub(crate) test_name: Style,
    pub(crate) description: Style,
}

impl Styles {
    pub(crate) fn colorize(&mut self) {
        self.suite = Style::new().magenta().bold();
        self.file = Style::new().cyan();
        self.test_name = Style::new().blue().bold();
        self.description = Style::new().dimmed();
    }
}
