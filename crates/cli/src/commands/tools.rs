//! `loopclaw tools`: print the tool catalog the model is offered.

use loopclaw_core::tool::ToolSpec;

fn describe(spec: &ToolSpec) -> String {
    let mut text = format!("  {}\n      {}\n", spec.name, spec.description);
    for (name, param) in &spec.parameters.properties {
        let marker = if spec.parameters.required.contains(name) { "*" } else { " " };
        text.push_str(&format!(
            "      {marker} {name} ({}): {}",
            param.kind.as_str(),
            param.description
        ));
        if !param.enum_values.is_empty() {
            text.push_str(&format!(" [{}]", param.enum_values.join(", ")));
        }
        text.push('\n');
    }
    text
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let definitions = loopclaw_tools::catalog::definitions();
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    let catalog = loopclaw_tools::catalog::all();
    println!("{} tools (* = required)\n", catalog.len());
    for spec in catalog {
        println!("{}", describe(spec));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_marks_required_params() {
        let spec = loopclaw_tools::catalog::spec(loopclaw_tools::ToolKind::ExecuteCode);
        let text = describe(spec);
        assert!(text.starts_with("  execute_code\n"));
        assert!(text.contains("* code (string)"));
        assert!(text.contains("  timeout (integer)"));
        assert!(text.contains("[python, javascript, bash]"));
    }
}
