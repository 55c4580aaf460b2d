use anyhow::{bail, Error};
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

/// Content lines longer than this many octets are folded when serialized.
const MAX_LINE_OCTETS: usize = 75;

fn strip_folds(s: &str) -> Result<String, Error> {
    let re = regex::Regex::new(r"\r?\n[\t ]")?;

    Ok(re.replace_all(s, "").into_owned())
}

/// Fold a content line so that no physical line exceeds
/// [`MAX_LINE_OCTETS`], without splitting a UTF-8 sequence.
fn fold_line(line: &str) -> String {
    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut octets = 0;

    for c in line.chars() {
        if octets + c.len_utf8() > MAX_LINE_OCTETS {
            folded.push_str("\r\n ");
            // The leading space counts towards the new line.
            octets = 1;
        }
        octets += c.len_utf8();
        folded.push(c);
    }

    folded
}

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct CalParser;

#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub sub_components: Vec<Component>,
    pub properties: Vec<Property>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Component {
        Component {
            name: name.into(),
            sub_components: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Parse every top level component in `data`.
    pub fn from_str_to_stream(data: &str) -> Result<Vec<Component>, Error> {
        let data = strip_folds(data)?;
        let pairs = CalParser::parse(Rule::stream, &data)?;

        pairs
            .filter(|pair| pair.as_rule() == Rule::component)
            .map(Component::from_pair)
            .collect()
    }

    fn from_pair(pair: Pair<Rule>) -> Result<Component, Error> {
        let span = pair.as_span();
        let mut name = None;
        let mut sub_components = Vec::new();
        let mut properties = Vec::new();

        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::name => name = Some(inner_pair.as_str().to_string()),
                Rule::component => sub_components.push(Component::from_pair(inner_pair)?),
                Rule::property => properties.push(Property::from_pair(inner_pair)?),
                _ => bail!("Unexpected type {:?}", inner_pair.as_rule()),
            }
        }

        if let Some(name) = name {
            Ok(Component {
                name,
                sub_components,
                properties,
            })
        } else {
            bail!("No name for component: {:?}", span.as_str());
        }
    }

    /// All properties with the given (case-insensitive) name.
    pub fn properties_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> {
        self.properties
            .iter()
            .filter(move |prop| prop.name.eq_ignore_ascii_case(name))
    }

    /// Serialize back to content lines, CRLF separated and folded.
    pub fn as_string(&self) -> String {
        let mut lines = vec![fold_line(&format!("BEGIN:{}", self.name))];
        lines.extend(self.properties.iter().map(|v| fold_line(&v.as_string())));
        lines.extend(self.sub_components.iter().map(|v| v.as_string()));
        lines.push(fold_line(&format!("END:{}", self.name)));

        lines.join("\r\n")
    }
}

#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub value: String,
    pub parameters: Vec<Parameter>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Property {
        Property {
            name: name.into(),
            value: value.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            values: vec![value.into()],
        });
        self
    }

    fn from_pair(pair: Pair<Rule>) -> Result<Property, Error> {
        let span = pair.as_span();
        let mut name = None;
        let mut value = None;
        let mut parameters = Vec::new();

        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::name => name = Some(inner_pair.as_str().to_string()),
                Rule::property_value => value = Some(inner_pair.as_str().to_string()),
                Rule::param => parameters.push(Parameter::from_pair(inner_pair)?),
                _ => bail!("Unexpected type {:?}", inner_pair.as_rule()),
            }
        }

        if let (Some(name), Some(value)) = (name, value) {
            Ok(Property {
                name,
                value,
                parameters,
            })
        } else {
            bail!("No name for property: {:?}", span.as_str());
        }
    }

    pub fn as_string(&self) -> String {
        if self.parameters.is_empty() {
            format!("{}:{}", self.name, self.value)
        } else {
            let params = self
                .parameters
                .iter()
                .map(|v| v.as_string())
                .collect::<Vec<_>>()
                .join(";");

            format!("{};{}:{}", self.name, params, self.value)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub values: Vec<String>,
}

impl Parameter {
    fn from_pair(pair: Pair<Rule>) -> Result<Parameter, Error> {
        let span = pair.as_span();
        let mut name = None;
        let mut values = Vec::new();
        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::name => name = Some(inner_pair.as_str().to_string()),
                Rule::param_value => values.push(inner_pair.as_str().trim_matches('"').to_string()),
                _ => bail!("Unexpected type {:?}", inner_pair.as_rule()),
            }
        }

        if values.is_empty() {
            bail!("No values for param {:?}", span.as_str());
        }

        if let Some(name) = name {
            Ok(Parameter { name, values })
        } else {
            bail!("No name for parameter: {:?}", span.as_str());
        }
    }

    pub fn as_string(&self) -> String {
        // Values containing separators have to be quoted.
        let values = self
            .values
            .iter()
            .map(|v| {
                if v.is_empty() || v.contains(&[',', ':', ';'] as &[_]) {
                    format!(r#""{}""#, v)
                } else {
                    v.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(",");

        format!("{}={}", self.name, values)
    }
}
