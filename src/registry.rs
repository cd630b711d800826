//! The protocol registry: a name-keyed map of every loaded protocol,
//! builtin raw formats included, plus the `parse_command`/`decode`/`convert`
//! operations the CLI dispatches through.
//!
//! Grounded on the Python source's `registry.py` (`ProtocolRegistry` class).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::{RemoteProtoError, Result};
use crate::numeric::quoted_split;
use crate::protocol::{DecodeMatch, ProtocolDef, RemoteCommand, SignalData};
use crate::raw::{broadlink::BroadlinkFormat, duration::DurationFormat, miio::MiioFormat, pronto::ProntoFormat};

/// The catalogue shipped with the crate itself, embedded at compile time.
pub const BUILTIN_CATALOGUE: &str = include_str!("../data/protocols.yaml");

/// A loaded set of protocols, keyed by name, ready to parse commands and
/// decode captured signals against.
pub struct ProtocolRegistry {
    protocols: BTreeMap<String, Arc<dyn ProtocolDef>>,
}

impl ProtocolRegistry {
    /// An empty registry with no protocols at all, not even the raw formats.
    pub fn empty() -> Self {
        Self { protocols: BTreeMap::new() }
    }

    /// A registry seeded with the four raw wire formats and the builtin
    /// YAML catalogue.
    pub fn with_builtin() -> Result<Self> {
        let mut registry = Self::empty();
        registry.add_raw_formats();
        registry.load_str("builtin", BUILTIN_CATALOGUE)?;
        Ok(registry)
    }

    fn add_raw_formats(&mut self) {
        self.add_protocol(Arc::new(DurationFormat::new()));
        self.add_protocol(Arc::new(ProntoFormat::new()));
        self.add_protocol(Arc::new(BroadlinkFormat::new()));
        self.add_protocol(Arc::new(MiioFormat::new()));
    }

    /// Registers a single protocol, replacing any existing one of the same name.
    pub fn add_protocol(&mut self, protocol: Arc<dyn ProtocolDef>) {
        self.protocols.insert(protocol.name().to_string(), protocol);
    }

    /// Parses and validates one YAML catalogue document, registering every
    /// protocol it defines. `source` labels any validation issues raised.
    pub fn load_str(&mut self, source: &str, text: &str) -> Result<()> {
        let protocols = crate::catalogue::parse_catalogue(source, text)?;
        for (name, codec) in protocols {
            self.protocols.insert(name, Arc::new(codec));
        }
        Ok(())
    }

    /// Loads a single catalogue file from disk.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)?;
        let before = self.protocols.len();
        self.load_str(&path.display().to_string(), &text)?;
        tracing::info!("loaded {} protocol(s) from {}", self.protocols.len().saturating_sub(before), path.display());
        Ok(())
    }

    /// Loads every `.yaml`/`.yml` file directly inside `dir` (non-recursive).
    pub fn load_dir(&mut self, dir: &Path) -> Result<()> {
        let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        entries.sort();
        for path in entries {
            let is_yaml = path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml");
            if path.is_file() && is_yaml {
                self.load_file(&path)?;
            }
        }
        Ok(())
    }

    pub fn get_protocol(&self, name: &str) -> Option<&Arc<dyn ProtocolDef>> {
        self.protocols.get(name)
    }

    /// Every registered protocol name, sorted.
    pub fn list_protocols(&self) -> Vec<&str> {
        self.protocols.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ProtocolDef>> {
        self.protocols.values()
    }

    /// Parses a `name[:arg]*` command string against its named protocol.
    /// The protocol name is matched case-insensitively (lowercased before
    /// lookup); the command's original casing is preserved in `command`.
    pub fn parse_command(&self, command: &str) -> Result<RemoteCommand> {
        let parts = quoted_split(command, ':');
        let (name, rest) = parts.split_first().ok_or_else(|| RemoteProtoError::UnknownProtocol(command.to_string()))?;
        let name = name.to_lowercase();

        let protocol = self
            .get_protocol(&name)
            .ok_or_else(|| RemoteProtoError::UnknownProtocol(name.clone()))?
            .clone();

        let args = protocol.parse_args(rest)?;
        Ok(RemoteCommand {
            name,
            args,
            command: command.to_string(),
            protocol,
        })
    }

    /// Tries every registered protocol (or only those named in `filter`,
    /// if given) against a captured signal, returning every match.
    pub fn decode(&self, signal: &SignalData, tolerance: f64, filter: Option<&[String]>) -> Vec<DecodeMatch> {
        let mut matches = Vec::new();
        for (name, protocol) in &self.protocols {
            if let Some(filter) = filter {
                if !filter.iter().any(|f| f == name) {
                    continue;
                }
            }
            matches.extend(protocol.decode(signal, tolerance));
        }
        matches
    }

    /// Parses a command, encodes it, then decodes the resulting signal
    /// against every protocol (or `filter`), round-tripping through the
    /// wire representation.
    pub fn convert(&self, command: &str, tolerance: f64, filter: Option<&[String]>) -> Result<Vec<DecodeMatch>> {
        let parsed = self.parse_command(command)?;
        let signal = parsed.protocol.encode(&parsed.args)?;
        Ok(self.decode(&signal, tolerance, filter))
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogue_loads_without_issues() {
        let registry = ProtocolRegistry::with_builtin().unwrap();
        assert!(registry.list_protocols().contains(&"duration"));
        assert!(registry.list_protocols().contains(&"nec"));
    }

    #[test]
    fn parses_and_round_trips_a_command() {
        let registry = ProtocolRegistry::with_builtin().unwrap();
        let matches = registry.convert("nec:0x04:0x08", 0.25, Some(&["nec".to_string()])).unwrap();
        assert!(matches.iter().any(|m| m.args == vec![4, 8, 0]));
    }

    #[test]
    fn protocol_name_is_matched_case_insensitively() {
        let registry = ProtocolRegistry::with_builtin().unwrap();
        let parsed = registry.parse_command("NEC:0x04:0x08").unwrap();
        assert_eq!(parsed.name, "nec");
        assert_eq!(parsed.command, "NEC:0x04:0x08");
    }

    #[test]
    fn unknown_protocol_is_an_error() {
        let registry = ProtocolRegistry::with_builtin().unwrap();
        assert!(matches!(registry.parse_command("bogus:1"), Err(RemoteProtoError::UnknownProtocol(_))));
    }
}
