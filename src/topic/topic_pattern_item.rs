//! MQTT topic pattern item types and functionality

use std::borrow::Cow;
use std::convert::TryFrom;

use arcstr::Substr;
use thiserror::Error;

/// Characters with regex meaning that may not appear in a literal level.
///
/// A backslash is only accepted as the first character of a custom wildcard
/// token such as `\ha_domain`.
pub const FORBIDDEN_CHARACTERS: [char; 12] =
	['[', ']', '{', '}', '(', ')', '\\', '^', '$', '|', '?', '*'];

/// Error types for topic pattern parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicPatternError {
	/// Hash wildcard (#) used not at the end of the pattern
	#[error(
		"Invalid topic pattern '{pattern}': # wildcard can only be the last \
		 segment"
	)]
	HashPosition {
		/// The invalid pattern
		pattern: String,
	},

	/// Wildcard characters (+ or #) used incorrectly
	#[error("Invalid wildcard usage: {usage}")]
	WildcardUsage {
		/// Description of invalid usage
		usage: String,
	},

	/// Empty topic is not valid
	#[error("Topic pattern cannot be empty")]
	EmptyTopic,

	/// Pattern exceeds the maximum supported length
	#[error("Topic pattern is too long: {length} > {max}")]
	TooLong {
		/// Length of the rejected pattern
		length: usize,
		/// Maximum allowed length
		max: usize,
	},

	/// A level contains a regex-special character
	#[error("Topic level '{segment}' contains forbidden character '{character}'")]
	ForbiddenCharacter {
		/// The offending level
		segment: String,
		/// The first forbidden character found
		character: char,
	},

	/// Escaped token that is not a known custom wildcard
	#[error("Unknown custom wildcard '{token}'")]
	UnknownCustomWildcard {
		/// The unrecognized token, including the leading backslash
		token: String,
	},

	/// The generated matcher failed to compile
	#[error("Topic pattern '{pattern}' produced an invalid matcher: {details}")]
	InvalidRegex {
		/// The pattern being compiled
		pattern: String,
		/// Compiler error message
		details: String,
	},
}

impl TopicPatternError {
	/// Creates a new HashPosition error
	pub fn hash_position(pattern: impl Into<String>) -> Self {
		Self::HashPosition {
			pattern: pattern.into(),
		}
	}

	/// Creates a new WildcardUsage error
	pub fn wildcard_usage(usage: impl Into<String>) -> Self {
		Self::WildcardUsage {
			usage: usage.into(),
		}
	}

	/// Creates a new ForbiddenCharacter error
	pub fn forbidden_character(segment: impl Into<String>, character: char) -> Self {
		Self::ForbiddenCharacter {
			segment: segment.into(),
			character,
		}
	}
}

/// Home Assistant integration domains recognized by `\ha_domain`.
pub const HA_DOMAINS: &[&str] = &[
	"alarm_control_panel",
	"automation",
	"binary_sensor",
	"button",
	"camera",
	"climate",
	"cover",
	"device_automation",
	"device_tracker",
	"event",
	"fan",
	"humidifier",
	"image",
	"input_boolean",
	"input_number",
	"input_select",
	"input_text",
	"lawn_mower",
	"light",
	"lock",
	"media_player",
	"notify",
	"number",
	"scene",
	"script",
	"select",
	"sensor",
	"siren",
	"switch",
	"tag",
	"text",
	"update",
	"vacuum",
	"valve",
	"water_heater",
];

/// Domain-specific single-level wildcards written as `\token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomWildcard {
	/// `\ha_domain`: one Home Assistant integration domain
	HaDomain,
	/// `\ha_entity`: one Home Assistant object id (`[a-z0-9_]+`)
	HaEntity,
}

impl CustomWildcard {
	/// Parses an escaped token such as `\ha_domain`.
	pub fn from_token(token: &str) -> Option<Self> {
		match token {
			| "\\ha_domain" => Some(Self::HaDomain),
			| "\\ha_entity" => Some(Self::HaEntity),
			| _ => None,
		}
	}

	/// Returns the token as written in a pattern.
	pub fn token(&self) -> &'static str {
		match self {
			| Self::HaDomain => "\\ha_domain",
			| Self::HaEntity => "\\ha_entity",
		}
	}

	/// Regex fragment matching exactly one level.
	pub fn regex_fragment(&self) -> Cow<'static, str> {
		match self {
			| Self::HaDomain => Cow::Owned(format!("(?:{})", HA_DOMAINS.join("|"))),
			| Self::HaEntity => Cow::Borrowed("[a-z0-9_]+"),
		}
	}
}

/// MQTT topic pattern segment: literal string or wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicPatternItem {
	/// Literal string segment
	Str(Substr),
	/// Single-level wildcard `+`
	Plus,
	/// Multi-level wildcard `#`
	Hash,
	/// Escaped domain-specific single-level wildcard
	Custom(CustomWildcard),
}

impl TopicPatternItem {
	/// Returns string representation of the pattern item.
	pub fn as_str(&self) -> &str {
		match self {
			| TopicPatternItem::Str(s) => s,
			| TopicPatternItem::Plus => "+",
			| TopicPatternItem::Hash => "#",
			| TopicPatternItem::Custom(custom) => custom.token(),
		}
	}

	/// Returns true if this item is a wildcard (`+`, `#` or a custom token).
	pub fn is_wildcard(&self) -> bool {
		!matches!(self, TopicPatternItem::Str(_))
	}

	/// Key used by the hierarchy index.
	///
	/// Literals are lowercased because matching is case-insensitive; every
	/// single-level wildcard collapses to `+`.
	pub fn hierarchy_key(&self) -> Cow<'_, str> {
		match self {
			| TopicPatternItem::Str(s) => Cow::Owned(s.to_lowercase()),
			| TopicPatternItem::Plus | TopicPatternItem::Custom(_) => {
				Cow::Borrowed("+")
			}
			| TopicPatternItem::Hash => Cow::Borrowed("#"),
		}
	}
}

impl std::fmt::Display for TopicPatternItem {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl TryFrom<Substr> for TopicPatternItem {
	type Error = TopicPatternError;
	fn try_from(item: Substr) -> Result<Self, Self::Error> {
		let res = match item.as_str() {
			| "+" => TopicPatternItem::Plus,
			| "#" => TopicPatternItem::Hash,
			| token if token.starts_with('\\') => {
				let custom = CustomWildcard::from_token(token).ok_or_else(|| {
					TopicPatternError::UnknownCustomWildcard {
						token: token.to_string(),
					}
				})?;
				TopicPatternItem::Custom(custom)
			}
			| level if level.contains(['+', '#']) => {
				return Err(TopicPatternError::wildcard_usage(level));
			}
			| level if level.contains('\0') => {
				return Err(TopicPatternError::wildcard_usage(format!(
					"null byte in level '{}'",
					level.escape_debug()
				)));
			}
			| level => {
				if let Some(character) =
					level.chars().find(|c| FORBIDDEN_CHARACTERS.contains(c))
				{
					return Err(TopicPatternError::forbidden_character(
						level, character,
					));
				}
				TopicPatternItem::Str(item)
			}
		};
		Ok(res)
	}
}
