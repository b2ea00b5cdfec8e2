//! Single-line text encoding of generated layouts.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use nightwatch_core::CellCoord;
use nightwatch_system_map_generation::{MapLayout, Placement};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SNAPSHOT_DOMAIN: &str = "nightwatch";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "nightwatch:v1";
const FIELD_DELIMITER: char = ':';

/// Grid size, player start and placed objects of a layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LayoutSnapshot {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) start: CellCoord,
    pub(crate) placements: Vec<Placement>,
}

#[derive(Serialize, Deserialize)]
struct SerializableSnapshot {
    start: CellCoord,
    placements: Vec<Placement>,
}

impl LayoutSnapshot {
    /// Captures the parts of a layout needed to rebuild it.
    pub(crate) fn from_layout(layout: &MapLayout) -> Self {
        Self {
            columns: layout.grid().width(),
            rows: layout.grid().height(),
            start: layout.start(),
            placements: layout.placements().to_vec(),
        }
    }

    /// Encodes the snapshot as `nightwatch:v1:WxH:<payload>`.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableSnapshot {
            start: self.start,
            placements: self.placements.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}{FIELD_DELIMITER}{}x{}{FIELD_DELIMITER}{encoded}",
            self.columns, self.rows
        ))
    }

    /// Decodes a snapshot from its text form.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(LayoutTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        let snapshot = Self {
            columns,
            rows,
            start: decoded.start,
            placements: decoded.placements,
        };
        if let Some(cell) = snapshot.first_out_of_bounds() {
            return Err(LayoutTransferError::CellOutOfBounds(cell));
        }
        Ok(snapshot)
    }

    fn first_out_of_bounds(&self) -> Option<CellCoord> {
        std::iter::once(self.start)
            .chain(self.placements.iter().map(|placement| placement.cell))
            .find(|cell| cell.column() >= self.columns || cell.row() >= self.rows)
    }
}

/// Errors that can occur while decoding layout strings.
#[derive(Debug, Error)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("layout string was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("layout string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("layout string is missing the version")]
    MissingVersion,
    /// The grid dimensions were missing.
    #[error("layout string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("layout string is missing the payload")]
    MissingPayload,
    /// The prefix named another format.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version is not understood.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode layout payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not process layout payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    /// A cell lies outside the declared grid.
    #[error("cell {0:?} lies outside the layout grid")]
    CellOutOfBounds(CellCoord),
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightwatch_core::PrefabKind;

    fn snapshot() -> LayoutSnapshot {
        LayoutSnapshot {
            columns: 12,
            rows: 8,
            start: CellCoord::new(1, 1),
            placements: vec![
                Placement {
                    prefab: PrefabKind::Exit,
                    cell: CellCoord::new(9, 6),
                },
                Placement {
                    prefab: PrefabKind::Obstacle2,
                    cell: CellCoord::new(4, 3),
                },
            ],
        }
    }

    #[test]
    fn encoded_layout_decodes_to_itself() {
        let original = snapshot();

        let encoded = original.encode().expect("snapshot encodes");
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:12x8:")));

        let decoded = LayoutSnapshot::decode(&encoded).expect("snapshot decodes");
        assert_eq!(original, decoded);
    }

    #[test]
    fn foreign_prefix_is_rejected() {
        let encoded = snapshot().encode().expect("snapshot encodes");
        let foreign = encoded.replacen("nightwatch", "lantern", 1);

        assert!(matches!(
            LayoutSnapshot::decode(&foreign),
            Err(LayoutTransferError::InvalidPrefix(prefix)) if prefix == "lantern"
        ));
    }

    #[test]
    fn malformed_strings_report_the_missing_part() {
        assert!(matches!(
            LayoutSnapshot::decode("   "),
            Err(LayoutTransferError::EmptyPayload)
        ));
        assert!(matches!(
            LayoutSnapshot::decode("nightwatch:v1"),
            Err(LayoutTransferError::MissingDimensions)
        ));
        assert!(matches!(
            LayoutSnapshot::decode("nightwatch:v2:3x3:e30"),
            Err(LayoutTransferError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            LayoutSnapshot::decode("nightwatch:v1:0x3:e30"),
            Err(LayoutTransferError::InvalidDimensions(_))
        ));
        assert!(matches!(
            LayoutSnapshot::decode("nightwatch:v1:3x3:!!"),
            Err(LayoutTransferError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn cells_outside_the_grid_are_rejected() {
        let mut shrunk = snapshot();
        shrunk.columns = 5;
        let encoded = shrunk.encode().expect("snapshot encodes");

        assert!(matches!(
            LayoutSnapshot::decode(&encoded),
            Err(LayoutTransferError::CellOutOfBounds(cell)) if cell == CellCoord::new(9, 6)
        ));
    }
}
