//! Generation library backed by the `JLC2KiCadLib` Python package.
//!
//! Each call runs a short script in a child interpreter. The request travels
//! as one JSON argument; the script prints one JSON line as its last line of
//! stdout.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::binding::{
    BindingError, BindingResolver, FootprintRequest, GenerationError, GenerationLibrary,
    GenerationResult, LibraryBinding, SymbolRequest,
};
use crate::bootstrap::{stderr_tail, CommandRunner, CommandSpec, InterpreterCandidate};

/// Import check for both entry points.
const IMPORT_CHECK: &str =
    "import JLC2KiCadLib.footprint.footprint, JLC2KiCadLib.symbol.symbol";

/// Error name Python prints for a missing package.
const MISSING_MODULE_MARKER: &str = "ModuleNotFoundError";

const BRIDGE_SCRIPT: &str = r#"import json, sys
req = json.loads(sys.argv[1])
if req["op"] == "footprint":
    from JLC2KiCadLib.footprint.footprint import create_footprint
    name, link = create_footprint(**req["args"])
    print(json.dumps({"footprint_name": name, "datasheet_link": link or None}))
else:
    from JLC2KiCadLib.symbol.symbol import create_symbol
    create_symbol(**req["args"])
    print(json.dumps({}))
"#;

/// Binds [`PythonLibrary`] after checking the package imports.
pub struct PythonBindingResolver {
    interpreter: Option<InterpreterCandidate>,
    runner: Arc<dyn CommandRunner>,
    package: String,
    timeout: Option<Duration>,
}

impl PythonBindingResolver {
    pub fn new(
        interpreter: Option<InterpreterCandidate>,
        runner: Arc<dyn CommandRunner>,
        package: impl Into<String>,
    ) -> Self {
        Self {
            interpreter,
            runner,
            package: package.into(),
            timeout: None,
        }
    }

    /// Bound every child run (builder pattern).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl BindingResolver for PythonBindingResolver {
    fn bind(&self) -> Result<LibraryBinding, BindingError> {
        let interpreter = self.interpreter.clone().ok_or(BindingError::NoInterpreter)?;
        let spec = CommandSpec::new(interpreter.path()).arg("-c").arg(IMPORT_CHECK);

        let output = self.runner.run(&spec, self.timeout).map_err(|e| BindingError::Load {
            reason: format!("{}: {}", interpreter, e),
        })?;

        if output.success() {
            debug!(interpreter = %interpreter, "Generation library importable");
            return Ok(LibraryBinding::bound(PythonLibrary {
                interpreter,
                runner: self.runner.clone(),
                timeout: self.timeout,
            }));
        }

        if output.stderr.contains(MISSING_MODULE_MARKER) {
            warn!(package = %self.package, "Generation library is not installed");
            Err(BindingError::NotInstalled {
                package: self.package.clone(),
            })
        } else {
            Err(BindingError::Load {
                reason: stderr_tail(&output.stderr),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct FootprintReply {
    footprint_name: String,
    datasheet_link: Option<String>,
}

/// Runs generation entry points in a child interpreter.
pub struct PythonLibrary {
    interpreter: InterpreterCandidate,
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl PythonLibrary {
    fn call(&self, entry_point: &'static str, request: Value) -> Result<Value, GenerationError> {
        let spec = CommandSpec::new(self.interpreter.path())
            .arg("-c")
            .arg(BRIDGE_SCRIPT)
            .arg(request.to_string());

        let output = self
            .runner
            .run(&spec, self.timeout)
            .map_err(|e| GenerationError::Launch(e.to_string()))?;

        if !output.success() {
            return Err(GenerationError::Failed {
                entry_point,
                message: stderr_tail(&output.stderr),
            });
        }

        let line = output
            .stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| GenerationError::Protocol(format!("{} printed nothing", entry_point)))?;
        serde_json::from_str(line).map_err(|e| GenerationError::Protocol(e.to_string()))
    }
}

impl GenerationLibrary for PythonLibrary {
    fn create_footprint(&self, request: &FootprintRequest) -> Result<GenerationResult, GenerationError> {
        let args = json!({
            "footprint_component_uuid": request.footprint_uuid,
            "component_id": request.part_id,
            "footprint_lib": request.footprint_lib,
            "output_dir": request.output_dir.to_string_lossy(),
            "model_base_variable": request.model_base_variable,
            "model_dir": request.model_dir,
            "skip_existing": request.skip_existing,
            "models": request.model_format.as_str(),
        });
        let reply = self.call("create_footprint", json!({ "op": "footprint", "args": args }))?;
        let reply: FootprintReply =
            serde_json::from_value(reply).map_err(|e| GenerationError::Protocol(e.to_string()))?;

        Ok(GenerationResult {
            footprint_qualified_name: reply.footprint_name,
            datasheet_link: reply.datasheet_link,
        })
    }

    fn create_symbol(&self, request: &SymbolRequest) -> Result<(), GenerationError> {
        let args = json!({
            "symbol_component_uuid": request.symbol_uuids,
            "footprint_name": request.footprint_reference,
            "datasheet_link": request.datasheet_link.as_deref().unwrap_or(""),
            "library_name": request.library_name,
            "symbol_path": request.symbol_path,
            "output_dir": request.output_dir.to_string_lossy(),
            "component_id": request.part_id,
            "skip_existing": request.skip_existing,
        });
        self.call("create_symbol", json!({ "op": "symbol", "args": args }))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use super::*;
    use crate::acquire::binding::ModelFormat;
    use crate::bootstrap::ScriptedRunner;

    fn resolver(runner: Arc<ScriptedRunner>) -> PythonBindingResolver {
        PythonBindingResolver::new(
            Some(InterpreterCandidate::new("/usr/bin/python3")),
            runner,
            "JLC2KiCadLib",
        )
    }

    fn footprint_request() -> FootprintRequest {
        FootprintRequest {
            footprint_uuid: "fp1".to_string(),
            part_id: "C326215".to_string(),
            footprint_lib: "footprint".to_string(),
            output_dir: PathBuf::from("/tmp/out"),
            model_base_variable: String::new(),
            model_dir: "packages3d".to_string(),
            skip_existing: false,
            model_format: ModelFormat::Step,
        }
    }

    fn request_json(spec: &CommandSpec) -> Value {
        let raw = spec.args.last().unwrap().to_string_lossy().into_owned();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_missing_module_is_not_installed() {
        let runner = Arc::new(ScriptedRunner::new().then_output(
            1,
            "",
            "Traceback (most recent call last):\nModuleNotFoundError: No module named 'JLC2KiCadLib'",
        ));

        let err = resolver(runner).bind().unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn test_other_import_failure_is_load_error() {
        let runner = Arc::new(ScriptedRunner::new().then_output(1, "", "SyntaxError: invalid syntax"));
        let err = resolver(runner).bind().unwrap_err();
        assert!(matches!(err, BindingError::Load { .. }));
    }

    #[test]
    fn test_no_interpreter() {
        let runner = Arc::new(ScriptedRunner::new());
        let err = PythonBindingResolver::new(None, runner.clone(), "JLC2KiCadLib")
            .bind()
            .unwrap_err();
        assert_eq!(err, BindingError::NoInterpreter);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_footprint_call_round_trip() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .then_output(0, "", "")
                .then_output(
                    0,
                    "creating footprint\n{\"footprint_name\": \"footprint:SOT-23-5\", \"datasheet_link\": null}\n",
                    "",
                ),
        );
        let binding = resolver(runner.clone()).bind().unwrap();
        let library = binding.library().unwrap();

        let result = library.create_footprint(&footprint_request()).unwrap();

        assert_eq!(result.footprint_qualified_name, "footprint:SOT-23-5");
        assert_eq!(result.datasheet_link, None);

        let calls = runner.calls();
        let request = request_json(&calls[1]);
        assert_eq!(request["op"], "footprint");
        assert_eq!(request["args"]["footprint_component_uuid"], "fp1");
        assert_eq!(request["args"]["models"], "STEP");
        assert_eq!(request["args"]["skip_existing"], false);
    }

    #[test]
    fn test_symbol_call_sends_rewritten_reference() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .then_output(0, "", "")
                .then_output(0, "{}\n", ""),
        );
        let binding = resolver(runner.clone()).bind().unwrap();

        binding
            .library()
            .unwrap()
            .create_symbol(&SymbolRequest {
                symbol_uuids: vec!["sym1".to_string(), "sym2".to_string()],
                footprint_reference: "jlc:SOT-23-5".to_string(),
                datasheet_link: None,
                library_name: "default_lib".to_string(),
                symbol_path: "symbol".to_string(),
                output_dir: PathBuf::from("/tmp/out"),
                part_id: "C326215".to_string(),
                skip_existing: true,
            })
            .unwrap();

        let request = request_json(&runner.calls()[1]);
        assert_eq!(request["op"], "symbol");
        assert_eq!(request["args"]["symbol_component_uuid"], json!(["sym1", "sym2"]));
        assert_eq!(request["args"]["footprint_name"], "jlc:SOT-23-5");
    }

    #[test]
    fn test_generation_failures() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .then_output(0, "", "")
                .then_output(1, "", "KeyError: 'dataStr'")
                .then_output(0, "not json", "")
                .then_error(io::ErrorKind::NotFound, "gone"),
        );
        let binding = resolver(runner).bind().unwrap();
        let library = binding.library().unwrap();

        assert!(matches!(
            library.create_footprint(&footprint_request()),
            Err(GenerationError::Failed { .. })
        ));
        assert!(matches!(
            library.create_footprint(&footprint_request()),
            Err(GenerationError::Protocol(_))
        ));
        assert!(matches!(
            library.create_footprint(&footprint_request()),
            Err(GenerationError::Launch(_))
        ));
    }
}
