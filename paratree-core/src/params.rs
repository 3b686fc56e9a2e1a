use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use paratree_framing::FramedBuffer;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Error;

/// One parameter's value, tagged by kind so a declared key can be packed
/// and unpacked without losing its type across a broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    StrArray(Vec<String>),
}

impl ParamValue {
    fn tag(&self) -> u8 {
        match self {
            ParamValue::Bool(_) => 0,
            ParamValue::Int(_) => 1,
            ParamValue::Real(_) => 2,
            ParamValue::Str(_) => 3,
            ParamValue::StrArray(_) => 4,
        }
    }

    fn encode(&self, buf: &mut FramedBuffer) {
        buf.write(self.tag());
        match self {
            ParamValue::Bool(v) => buf.write(*v),
            ParamValue::Int(v) => buf.write(*v),
            ParamValue::Real(v) => buf.write(*v),
            ParamValue::Str(v) => buf.write_str(v),
            ParamValue::StrArray(items) => {
                buf.write(items.len() as i32);
                for item in items {
                    buf.write_str(item);
                }
            }
        }
    }

    fn decode(buf: &mut FramedBuffer) -> Result<Self, Error> {
        Ok(match buf.read::<u8>()? {
            0 => ParamValue::Bool(buf.read::<bool>()?),
            1 => ParamValue::Int(buf.read::<i64>()?),
            2 => ParamValue::Real(buf.read::<f64>()?),
            3 => ParamValue::Str(buf.read_string()?),
            4 => {
                let len = buf.read::<i32>()?;
                let mut items = Vec::with_capacity(len.max(0) as usize);
                for _ in 0..len {
                    items.push(buf.read_string()?);
                }
                ParamValue::StrArray(items)
            }
            other => return Err(paratree_framing::Error::SizeMismatch(other as i32).into()),
        })
    }

    /// Parses a raw text token into a value shaped like `current`, so a
    /// parsed `keyword value` pair can update an already-declared key
    /// without losing its kind.
    fn parse_like(current: &ParamValue, token: &str) -> Option<ParamValue> {
        match current {
            ParamValue::Bool(_) => token
                .trim()
                .parse::<i64>()
                .ok()
                .map(|v| ParamValue::Bool(v != 0)),
            ParamValue::Int(_) => token.trim().parse::<i64>().ok().map(ParamValue::Int),
            ParamValue::Real(_) => token.trim().parse::<f64>().ok().map(ParamValue::Real),
            ParamValue::Str(_) => Some(ParamValue::Str(token.to_string())),
            ParamValue::StrArray(_) => Some(ParamValue::StrArray(vec![token.to_string()])),
        }
    }
}

/// A typed, keyed configuration set: declare keys with a default value,
/// then populate them from a parameter file, an argument list, or direct
/// calls, and broadcast the result through the framing layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterSet {
    values: HashMap<String, ParamValue>,
    obsolete: HashSet<String>,
    quiet: bool,
}

impl ParameterSet {
    /// Creates an empty set with no declared keys.
    pub fn new() -> Self {
        ParameterSet::default()
    }

    /// Declares `key` with its default value and type. Re-declaring an
    /// existing key resets it to `default`.
    pub fn declare(&mut self, key: impl Into<String>, default: ParamValue) {
        self.values.insert(key.into(), default);
    }

    /// Marks `key` as obsolete: it still has no effect if set, but a
    /// warning is logged when a parameter source attempts to set it.
    pub fn mark_obsolete(&mut self, key: impl Into<String>) {
        self.obsolete.insert(key.into());
    }

    /// Reads a declared key's current value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Sets a declared key directly, preserving its existing kind.
    /// Declares the key fresh (as a string) if it was not already known.
    pub fn set(&mut self, key: impl Into<String>, value: ParamValue) {
        self.values.insert(key.into(), value);
    }

    /// Whether echoing parsed assignments is currently suppressed.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Populates keys from an alternating `key value key value ...` list,
    /// such as trailing CLI arguments.
    pub fn read_args(&mut self, args: &[String]) {
        let mut iter = args.iter();
        while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
            self.apply_assignment(key, value);
        }
    }

    /// Reads a parameter file, following `ParamFile` includes recursively.
    pub fn read_file(&mut self, path: &Path) -> Result<(), Error> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::ParameterFileUnopenable(path.to_path_buf(), e))?;
        self.read_str(&text, path.parent());
        Ok(())
    }

    fn read_str(&mut self, text: &str, base_dir: Option<&Path>) {
        for line in text.lines() {
            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            if keyword
                .chars()
                .next()
                .is_some_and(|c| c.is_control())
            {
                continue;
            }
            let Some(value) = tokens.next() else {
                continue;
            };

            match keyword {
                "ParamFile" => {
                    let included = match base_dir {
                        Some(dir) => dir.join(value),
                        None => Path::new(value).to_path_buf(),
                    };
                    if let Err(err) = self.read_file(&included) {
                        warn!(path = %included.display(), error = %err, "could not include parameter file");
                    }
                }
                "Quiet" => {
                    self.quiet = value.trim() != "0";
                }
                _ => self.apply_assignment(keyword, value),
            }
        }
    }

    fn apply_assignment(&mut self, key: &str, raw_value: &str) {
        if self.obsolete.contains(key) {
            warn!(keyword = key, "ignoring obsolete parameter keyword");
            return;
        }
        let Some(current) = self.values.get(key) else {
            warn!(keyword = key, "ignoring unknown parameter keyword");
            return;
        };
        let Some(parsed) = ParamValue::parse_like(current, raw_value) else {
            warn!(keyword = key, value = raw_value, "could not parse parameter value");
            return;
        };
        if !self.quiet {
            tracing::info!(keyword = key, value = ?parsed, "parameter set");
        }
        self.values.insert(key.to_string(), parsed);
    }

    /// Packs this set into a framed buffer for transmission.
    pub fn pack(&self, buf: &mut FramedBuffer) {
        buf.write(self.values.len() as i32);
        for (key, value) in &self.values {
            buf.write_str(key);
            value.encode(buf);
        }
        buf.write(self.quiet);
    }

    /// Reconstructs a set previously packed with [`Self::pack`].
    pub fn unpack(buf: &mut FramedBuffer) -> Result<Self, Error> {
        let len = buf.read::<i32>()?;
        let mut values = HashMap::with_capacity(len.max(0) as usize);
        for _ in 0..len {
            let key = buf.read_string()?;
            let value = ParamValue::decode(buf)?;
            values.insert(key, value);
        }
        let quiet = buf.read::<bool>()?;
        Ok(ParameterSet {
            values,
            obsolete: HashSet::new(),
            quiet,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_short_lines_are_ignored() {
        let mut params = ParameterSet::new();
        params.declare("TimeLimit", ParamValue::Real(60.0));
        params.read_str("TimeLimit\nMystery 1\nTimeLimit 30\n", None);
        assert_eq!(params.get("TimeLimit"), Some(&ParamValue::Real(30.0)));
    }

    #[test]
    fn obsolete_keyword_is_skipped_with_a_warning() {
        let mut params = ParameterSet::new();
        params.declare("NodeLimit", ParamValue::Int(100));
        params.mark_obsolete("NodeLimit");
        params.read_str("NodeLimit 5\n", None);
        assert_eq!(params.get("NodeLimit"), Some(&ParamValue::Int(100)));
    }

    #[test]
    fn quiet_keyword_toggles_echo() {
        let mut params = ParameterSet::new();
        assert!(!params.is_quiet());
        params.read_str("Quiet 1\n", None);
        assert!(params.is_quiet());
    }

    #[test]
    fn read_args_applies_alternating_pairs() {
        let mut params = ParameterSet::new();
        params.declare("Gap", ParamValue::Real(0.01));
        params.read_args(&["Gap".to_string(), "0.05".to_string()]);
        assert_eq!(params.get("Gap"), Some(&ParamValue::Real(0.05)));
    }

    #[test]
    fn pack_unpack_round_trips_every_kind() {
        let mut params = ParameterSet::new();
        params.declare("Flag", ParamValue::Bool(true));
        params.declare("Count", ParamValue::Int(7));
        params.declare("Gap", ParamValue::Real(0.01));
        params.declare("Name", ParamValue::Str("alpha".into()));
        params.declare(
            "Tags",
            ParamValue::StrArray(vec!["a".into(), "b".into()]),
        );

        let mut buf = FramedBuffer::new("params");
        params.pack(&mut buf);
        buf.rewind();
        let decoded = ParameterSet::unpack(&mut buf).unwrap();

        assert_eq!(decoded.get("Flag"), Some(&ParamValue::Bool(true)));
        assert_eq!(decoded.get("Count"), Some(&ParamValue::Int(7)));
        assert_eq!(decoded.get("Gap"), Some(&ParamValue::Real(0.01)));
        assert_eq!(decoded.get("Name"), Some(&ParamValue::Str("alpha".into())));
        assert_eq!(
            decoded.get("Tags"),
            Some(&ParamValue::StrArray(vec!["a".into(), "b".into()]))
        );
    }
}
