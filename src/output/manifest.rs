use std::fmt::Write;

use crate::job::JobManifest;

/// Prints a job manifest as a shell-friendly listing.
pub fn print_manifest(manifest: &JobManifest) {
    print!("{}", render_manifest(manifest));
}

fn render_manifest(manifest: &JobManifest) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# --------- variables ---------------");
    for (name, value) in &manifest.variables {
        let _ = writeln!(output, "export {name}={}", shell_quote(value));
    }

    let _ = writeln!(output, "\n\n# --------- full script ---------------");
    for phase in &manifest.script {
        let _ = writeln!(output, "# {}", phase.phase);
        for line in &phase.lines {
            let _ = writeln!(output, "{line}");
        }
        let _ = writeln!(output);
    }

    if let Some(image) = &manifest.image {
        let _ = writeln!(output, "\n\n# --------- container image ---------------");
        let _ = writeln!(output, "{image}");
    }

    output
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ScriptPhase;
    use std::collections::BTreeMap;

    fn manifest(image: Option<&str>) -> JobManifest {
        JobManifest {
            name: "job".to_string(),
            variables: BTreeMap::from([
                ("A".to_string(), "plain".to_string()),
                ("B".to_string(), "it's".to_string()),
            ]),
            script: vec![
                ScriptPhase {
                    phase: "before_script".to_string(),
                    lines: vec![],
                },
                ScriptPhase {
                    phase: "script".to_string(),
                    lines: vec!["make".to_string(), "make check".to_string()],
                },
            ],
            image: image.map(String::from),
        }
    }

    #[test]
    fn exports_quoted_variables() {
        let output = render_manifest(&manifest(None));

        assert!(output.contains("export A='plain'\n"));
        assert!(output.contains(r"export B='it'\''s'"));
    }

    #[test]
    fn script_phases_have_headers() {
        let output = render_manifest(&manifest(None));

        assert!(output.contains("# before_script\n\n# script\nmake\nmake check\n\n"));
        assert!(!output.contains("container image"));
    }

    #[test]
    fn image_block_is_printed_when_known() {
        let output = render_manifest(&manifest(Some("debian:bookworm")));

        assert!(output.ends_with("# --------- container image ---------------\ndebian:bookworm\n"));
    }
}
