use std::ops::Range;

use serde::{Deserialize, Serialize};
use skl_types::{Cell, Row, RowNumber, SaltScheme};

use crate::error::{MorselError, MorselResult};

/// What sort of source a ledger commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerKind {
    /// Rows of a typed table.
    Table,
    /// A trusted timestamping chain.
    Timechain,
    /// Lines of a text log.
    Log,
    /// A byte stream split into records.
    Bstream,
}

impl LedgerKind {
    pub const fn code(&self) -> u8 {
        match self {
            Self::Table => 1,
            Self::Timechain => 2,
            Self::Log => 3,
            Self::Bstream => 4,
        }
    }

    pub fn from_code(code: u8) -> MorselResult<Self> {
        match code {
            1 => Ok(Self::Table),
            2 => Ok(Self::Timechain),
            3 => Ok(Self::Log),
            4 => Ok(Self::Bstream),
            other => Err(MorselError::UnknownLedgerKind(other)),
        }
    }
}

/// Timestamping policy of a TIMECHAIN ledger.
///
/// Time is binned into blocks of `2^bin_exponent` milliseconds counted from
/// `inception_utc_millis`; block 1 starts at inception.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimechainParams {
    pub bin_exponent: u8,
    pub inception_utc_millis: i64,
}

impl TimechainParams {
    /// Largest bin exponent accepted; keeps block arithmetic inside `i64`.
    pub const MAX_BIN_EXPONENT: u8 = 62;

    pub fn new(bin_exponent: u8, inception_utc_millis: i64) -> MorselResult<Self> {
        let params = Self {
            bin_exponent,
            inception_utc_millis,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> MorselResult<()> {
        if self.bin_exponent > Self::MAX_BIN_EXPONENT {
            return Err(MorselError::InvalidTimechain("bin exponent too large"));
        }
        Ok(())
    }

    /// Block number covering `utc_millis`, or `None` before inception.
    pub fn block_for(&self, utc_millis: i64) -> Option<RowNumber> {
        let elapsed = utc_millis.checked_sub(self.inception_utc_millis)?;
        if elapsed < 0 {
            return None;
        }
        Some(((elapsed as u64) >> self.bin_exponent) + 1)
    }

    /// UTC millisecond range `[start, end)` covered by `block`.
    pub fn block_range(&self, block: RowNumber) -> Option<Range<i64>> {
        let index = i64::try_from(block.checked_sub(1)?).ok()?;
        let width = 1i64 << self.bin_exponent;
        let start = index
            .checked_mul(width)?
            .checked_add(self.inception_utc_millis)?;
        Some(start..start.checked_add(width)?)
    }
}

/// How raw source bytes split into rows and cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowParsing {
    pub row_delimiter: String,
    /// Lines starting with this prefix are skipped.
    pub comment_prefix: Option<String>,
    /// Any of these characters separates tokens; `None` keeps each line as
    /// a single cell.
    pub token_delimiters: Option<String>,
    pub trim_tokens: bool,
    pub skip_blank: bool,
}

impl Default for RowParsing {
    fn default() -> Self {
        Self {
            row_delimiter: "\n".into(),
            comment_prefix: None,
            token_delimiters: None,
            trim_tokens: false,
            skip_blank: true,
        }
    }
}

impl RowParsing {
    pub(crate) const TRIM_TOKENS: u8 = 0b01;
    pub(crate) const SKIP_BLANK: u8 = 0b10;

    pub fn csv() -> Self {
        Self {
            token_delimiters: Some(",".into()),
            trim_tokens: true,
            comment_prefix: Some("#".into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MorselResult<()> {
        if self.row_delimiter.is_empty() {
            return Err(MorselError::InvalidParsing("empty row delimiter"));
        }
        if self.comment_prefix.as_deref() == Some("") {
            return Err(MorselError::InvalidParsing("empty comment prefix"));
        }
        if self.token_delimiters.as_deref() == Some("") {
            return Err(MorselError::InvalidParsing("empty token delimiter set"));
        }
        Ok(())
    }

    pub(crate) fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.trim_tokens {
            flags |= Self::TRIM_TOKENS;
        }
        if self.skip_blank {
            flags |= Self::SKIP_BLANK;
        }
        flags
    }

    /// Split `raw` into rows numbered from `first_row`. Comment lines and,
    /// when `skip_blank` is set, blank lines do not consume a row number.
    /// Every token becomes a STRING cell.
    pub fn rows(&self, raw: &[u8], first_row: RowNumber) -> MorselResult<Vec<(RowNumber, Row)>> {
        self.validate()?;
        let text = std::str::from_utf8(raw).map_err(|e| {
            MorselError::Wire(skl_types::TypeError::InvalidUtf8 {
                offset: e.valid_up_to(),
            })
        })?;
        let text = text.strip_suffix(self.row_delimiter.as_str()).unwrap_or(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        let mut next = first_row;
        for line in text.split(self.row_delimiter.as_str()) {
            if let Some(prefix) = &self.comment_prefix {
                if line.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if self.skip_blank && line.trim().is_empty() {
                continue;
            }
            rows.push((next, self.tokenize(line)));
            next += 1;
        }
        Ok(rows)
    }

    fn tokenize(&self, line: &str) -> Row {
        let token = |t: &str| {
            if self.trim_tokens {
                Cell::string(t.trim())
            } else {
                Cell::string(t)
            }
        };
        match &self.token_delimiters {
            Some(delims) => line.split(|c: char| delims.contains(c)).map(token).collect(),
            None => Row::new(vec![token(line)]),
        }
    }
}

/// Metadata of one ledger in a morsel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub kind: LedgerKind,
    pub alias: String,
    /// Where the ledger lives, e.g. a URL or file path.
    pub origin: Option<String>,
    pub notes: Option<String>,
    pub assets: Option<Vec<u8>>,
    pub salt: SaltScheme,
    /// Required for TIMECHAIN ledgers, absent otherwise.
    pub timechain: Option<TimechainParams>,
    /// Never set on TIMECHAIN ledgers.
    pub parsing: Option<RowParsing>,
}

impl LedgerInfo {
    pub fn new(kind: LedgerKind, alias: impl Into<String>) -> Self {
        Self {
            kind,
            alias: alias.into(),
            origin: None,
            notes: None,
            assets: None,
            salt: SaltScheme::default(),
            timechain: None,
            parsing: None,
        }
    }

    pub fn timechain(alias: impl Into<String>, params: TimechainParams) -> Self {
        Self {
            timechain: Some(params),
            ..Self::new(LedgerKind::Timechain, alias)
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_assets(mut self, assets: impl Into<Vec<u8>>) -> Self {
        self.assets = Some(assets.into());
        self
    }

    pub fn with_salt(mut self, salt: SaltScheme) -> Self {
        self.salt = salt;
        self
    }

    pub fn with_parsing(mut self, parsing: RowParsing) -> Self {
        self.parsing = Some(parsing);
        self
    }

    pub fn validate(&self) -> MorselResult<()> {
        if self.alias.is_empty() {
            return Err(MorselError::EmptyAlias);
        }
        if self.assets.is_some() && self.notes.is_none() {
            return Err(MorselError::AssetsWithoutNotes {
                scope: format!("ledger {:?}", self.alias),
            });
        }
        let meta_error = |reason| MorselError::KindMetadata {
            alias: self.alias.clone(),
            reason,
        };
        match (self.kind, &self.timechain, &self.parsing) {
            (LedgerKind::Timechain, None, _) => {
                return Err(meta_error("timechain ledger without timechain parameters"))
            }
            (LedgerKind::Timechain, Some(_), Some(_)) => {
                return Err(meta_error("timechain ledger cannot carry row parsing"))
            }
            (LedgerKind::Timechain, Some(params), None) => {
                if params.bin_exponent > TimechainParams::MAX_BIN_EXPONENT {
                    return Err(meta_error("timechain bin exponent too large"));
                }
            }
            (_, Some(_), _) => {
                return Err(meta_error("timechain parameters on a non-timechain ledger"))
            }
            (_, None, Some(parsing)) => parsing.validate()?,
            (_, None, None) => {}
        }
        Ok(())
    }
}
