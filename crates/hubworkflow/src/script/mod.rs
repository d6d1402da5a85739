//! Workflow script statements
//!
//! A script is line oriented: every statement occupies exactly one line, so a
//! statement's index plus one is its line number. Formatting and parsing are
//! inverse on anything this crate writes.

mod parser;
mod validate;

pub use validate::ScriptSummary;

use hubcore::{ParamValue, ScriptError};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Blank,
    Comment(String),
    /// `<var> = getMasterHub()`
    MasterHub { var: String },
    /// `<var> = getVistleSession()`
    Session { var: String },
    /// `<token> = spawnAsync(<hub>, '<type>')`
    SpawnAsync {
        token: String,
        hub: String,
        type_name: String,
    },
    /// `<var> = waitForSpawn(<token>)`
    WaitForSpawn { var: String, token: String },
    /// `set<Type>Param(<module>, '<name>', <values>, <delayed>)`
    SetParameter {
        module: String,
        name: String,
        value: ParamValue,
        delayed: bool,
    },
    /// `applyParameters(<module>)`
    ApplyParameters { module: String },
    /// `printInfo('<text>')`
    PrintInfo(String),
    /// `<var> = waitForHub()`
    WaitForHub { var: String },
    /// `<var> = waitForHubs(<count>)`
    WaitForHubs { var: String, count: usize },
    /// `<var> = <list>[<index>]`
    SelectHub {
        var: String,
        list: String,
        index: usize,
    },
    /// `connect(<module>,'<port>', <module>,'<port>')`
    Connect {
        from_module: String,
        from_port: String,
        to_module: String,
        to_port: String,
    },
}

impl Statement {
    pub fn comment(text: impl Into<String>) -> Self {
        Statement::Comment(text.into())
    }

    /// Blank lines and comments
    pub fn is_trivia(&self) -> bool {
        matches!(self, Statement::Blank | Statement::Comment(_))
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Blank => Ok(()),
            Statement::Comment(text) if text.is_empty() => write!(f, "#"),
            Statement::Comment(text) => write!(f, "# {}", text),
            Statement::MasterHub { var } => write!(f, "{} = getMasterHub()", var),
            Statement::Session { var } => write!(f, "{} = getVistleSession()", var),
            Statement::SpawnAsync {
                token,
                hub,
                type_name,
            } => write!(f, "{} = spawnAsync({}, {})", token, hub, quote(type_name)),
            Statement::WaitForSpawn { var, token } => {
                write!(f, "{} = waitForSpawn({})", var, token)
            }
            Statement::SetParameter {
                module,
                name,
                value,
                delayed,
            } => {
                let mut args = vec![module.clone(), quote(name)];
                args.extend(value_args(value));
                args.push(if *delayed { "True" } else { "False" }.to_string());
                write!(f, "set{}Param({})", value.param_type(), args.join(", "))
            }
            Statement::ApplyParameters { module } => write!(f, "applyParameters({})", module),
            Statement::PrintInfo(text) => write!(f, "printInfo({})", quote(text)),
            Statement::WaitForHub { var } => write!(f, "{} = waitForHub()", var),
            Statement::WaitForHubs { var, count } => {
                write!(f, "{} = waitForHubs({})", var, count)
            }
            Statement::SelectHub { var, list, index } => {
                write!(f, "{} = {}[{}]", var, list, index)
            }
            Statement::Connect {
                from_module,
                from_port,
                to_module,
                to_port,
            } => write!(
                f,
                "connect({},{}, {},{})",
                from_module,
                quote(from_port),
                to_module,
                quote(to_port)
            ),
        }
    }
}

/// Ordered statement list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    statements: Vec<Statement>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Statements paired with their one-based line numbers
    pub fn lines(&self) -> impl Iterator<Item = (usize, &Statement)> {
        self.statements
            .iter()
            .enumerate()
            .map(|(index, statement)| (index + 1, statement))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let statements = text
            .lines()
            .enumerate()
            .map(|(index, line)| parser::parse_line(index + 1, line))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { statements })
    }
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Script::parse(s)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl FromIterator<Statement> for Script {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

fn value_args(value: &ParamValue) -> Vec<String> {
    match value {
        ParamValue::Int(i) => vec![i.to_string()],
        ParamValue::Float(x) => vec![format_float(*x)],
        ParamValue::String(s) => vec![quote(s)],
        ParamValue::Vector(v) => v.iter().map(|x| format_float(*x)).collect(),
        ParamValue::IntVector(v) => v.iter().map(|i| i.to_string()).collect(),
    }
}

/// Shortest representation that parses back to the same bits
pub(crate) fn format_float(x: f64) -> String {
    format!("{:?}", x)
}

pub(crate) fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_delimiters() {
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(r#"a\b"c"#), r#"'a\\b\"c'"#);
        assert_eq!(quote("two\nlines"), r"'two\nlines'");
    }

    #[test]
    fn test_set_parameter_formatting() {
        let statement = Statement::SetParameter {
            module: "mIsoSurface3".into(),
            name: "isopoint".into(),
            value: ParamValue::Vector(vec![0.0, 1.5, -2.0]),
            delayed: true,
        };
        assert_eq!(
            statement.to_string(),
            "setVectorParam(mIsoSurface3, 'isopoint', 0.0, 1.5, -2.0, True)"
        );

        let statement = Statement::SetParameter {
            module: "VistleSession".into(),
            name: "archive_compression".into(),
            value: ParamValue::Int(2),
            delayed: false,
        };
        assert_eq!(
            statement.to_string(),
            "setIntParam(VistleSession, 'archive_compression', 2, False)"
        );
    }

    #[test]
    fn test_connect_formatting() {
        let statement = Statement::Connect {
            from_module: "mReader1".into(),
            from_port: "data_out".into(),
            to_module: "mWriter2".into(),
            to_port: "data_in".into(),
        };
        assert_eq!(
            statement.to_string(),
            "connect(mReader1,'data_out', mWriter2,'data_in')"
        );
    }

    #[test]
    fn test_script_text_round_trips() {
        let text = "\
MasterHub = getMasterHub()
VistleSession = getVistleSession()

# spawn all local modules
umReader1 = spawnAsync(MasterHub, 'Reader')

mReader1 = waitForSpawn(umReader1)
setStringParam(mReader1, 'filename', 'C:\\\\data\\'s.vtk', True)
setFloatParam(mReader1, 'scale', 1e-7, True)
setIntVectorParam(mReader1, 'range', 0, -4, True)
applyParameters(mReader1)

printInfo('waiting for 2 slave hubs to connect...')
slavehubs = waitForHubs(2)
Slave0 = slavehubs[0]
Slave1 = slavehubs[1]
connect(mReader1,'out0', mReader1,'in0')
";
        let script: Script = text.parse().unwrap();
        assert_eq!(script.to_string(), text);
        assert_eq!(script.len(), text.lines().count());
    }
}
