//! Runnable script: parameter declarations and assignments ahead of the
//! query text.
//!
//! ```text
//! declare @param_age bigint
//! declare @param_value_1 nvarchar(300)
//!
//! select @param_age = 22
//! select @param_value_1 = 'Steve'
//!
//! select
//! 	...
//! ```

use crate::config::BuildOptions;
use crate::params::{ParamKind, Parameter};

/// SQL type used in the `declare` line.
pub fn declared_type(kind: ParamKind, options: &BuildOptions) -> String {
    match kind {
        ParamKind::BigInt => "bigint".to_string(),
        ParamKind::Decimal => "decimal(38, 10)".to_string(),
        ParamKind::NChar => "nchar".to_string(),
        ParamKind::NVarChar => format!("nvarchar({})", options.text_parameter_length),
        ParamKind::DateTime => "datetime".to_string(),
    }
}

/// Right-hand side of the assignment line.
pub fn literal(param: &Parameter) -> String {
    match param.kind {
        ParamKind::BigInt | ParamKind::Decimal => param.value.clone(),
        ParamKind::NChar | ParamKind::NVarChar => format!("'{}'", param.value.replace('\'', "''")),
        ParamKind::DateTime => format!("convert(datetime, '{}', 106)", param.value),
    }
}

/// Declarations, a blank line, assignments, a blank line, then `query`.
/// With no parameters the script is the query itself.
pub fn render_script(params: &[Parameter], query: &str, options: &BuildOptions) -> String {
    if params.is_empty() {
        return query.to_string();
    }
    let ending = options.line_ending.as_str();
    let mut script = String::new();
    for param in params {
        script.push_str(&format!(
            "declare {} {}{}",
            param.name,
            declared_type(param.kind, options),
            ending
        ));
    }
    script.push_str(ending);
    for param in params {
        script.push_str(&format!("select {} = {}{}", param.name, literal(param), ending));
    }
    script.push_str(ending);
    script.push_str(query);
    script
}
