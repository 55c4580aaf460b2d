use crate::parser;

/// The property parameters that change how a value is decoded. Anything
/// else is carried through as [`Parameter::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    AltRep { uri: String },

    CN(String),

    /// Inline encoding, `8BIT` or `BASE64`.
    Encoding(String),

    FormatType(String),

    Language(String),

    /// Which instances a RECURRENCE-ID applies to. The only value defined
    /// is `THISANDFUTURE`.
    Range(String),

    /// The TZID a DATE-TIME value is local to.
    TimeZoneID(String),

    /// Overrides the default value type of the property, e.g. `DATE`.
    ValueDataType(String),

    Other { name: String, values: Vec<String> },
}

impl From<parser::Parameter> for Parameter {
    fn from(p: parser::Parameter) -> Self {
        let name = p.name.to_ascii_uppercase();
        let mut values = p.values;

        // Single-valued parameters take the last value given.
        let single = |values: &mut Vec<String>| values.pop().unwrap_or_default();

        match &name as &str {
            "ALTREP" => Parameter::AltRep {
                uri: single(&mut values),
            },
            "CN" => Parameter::CN(single(&mut values)),
            "ENCODING" => Parameter::Encoding(single(&mut values)),
            "FMTTYPE" => Parameter::FormatType(single(&mut values)),
            "LANGUAGE" => Parameter::Language(single(&mut values)),
            "RANGE" => Parameter::Range(single(&mut values)),
            "TZID" => Parameter::TimeZoneID(single(&mut values)),
            "VALUE" => Parameter::ValueDataType(single(&mut values)),

            _ => Parameter::Other { name, values },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl<I> From<I> for ParameterSet
where
    I: IntoIterator<Item = parser::Parameter>,
{
    fn from(iter: I) -> Self {
        ParameterSet {
            parameters: iter.into_iter().map(Parameter::from).collect(),
        }
    }
}

impl ParameterSet {
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn get_value_data_type(&self) -> Option<&str> {
        self.parameters.iter().find_map(|param| match param {
            Parameter::ValueDataType(data_type) => Some(data_type as &str),
            _ => None,
        })
    }

    pub fn get_encoding(&self) -> Option<&str> {
        self.parameters.iter().find_map(|param| match param {
            Parameter::Encoding(encoding) => Some(encoding as &str),
            _ => None,
        })
    }

    pub fn get_tzid(&self) -> Option<&str> {
        self.parameters.iter().find_map(|param| match param {
            Parameter::TimeZoneID(tzid) => Some(tzid as &str),
            _ => None,
        })
    }

    pub fn get_range(&self) -> Option<&str> {
        self.parameters.iter().find_map(|param| match param {
            Parameter::Range(range) => Some(range as &str),
            _ => None,
        })
    }

    /// Whether a RECURRENCE-ID carries `RANGE=THISANDFUTURE`.
    pub fn is_this_and_future(&self) -> bool {
        self.get_range()
            .map_or(false, |range| range.eq_ignore_ascii_case("THISANDFUTURE"))
    }

    /// Whether `VALUE` overrides the value type to `value_type`.
    pub fn is_value_type(&self, value_type: &str) -> bool {
        self.get_value_data_type()
            .map_or(false, |data_type| data_type.eq_ignore_ascii_case(value_type))
    }
}
