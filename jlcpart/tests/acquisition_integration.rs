//! End-to-end acquisition through the public API with test doubles.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jlcpart::acquire::{
    AcquireMode, BindingError, BindingResolver, FootprintRequest, GenerationError, GenerationLibrary,
    GenerationResult, LibraryBinding, SymbolRequest,
};
use jlcpart::bootstrap::{
    BootstrapConfig, Bootstrapper, CommandOutput, CommandRunner, CommandSpec, InterpreterCandidate,
    LatestVersionSource,
};
use jlcpart::catalog::CatalogClient;
use jlcpart::config::ConfigFile;
use jlcpart::delivery::{DeliveryOutcome, HostDocument, Placement, TransientChannel};
use jlcpart::http::{HttpClient, HttpError};
use jlcpart::{FailureKind, Session, UserFacing};
use tempfile::TempDir;

const C326215_BODY: &str = r#"{
    "success": true,
    "result": [
        {"component_uuid": "sym1", "title": "unit A"},
        {"component_uuid": "sym2", "title": "unit B"},
        {"component_uuid": "fp1", "title": "SOT-23-5"}
    ]
}"#;

/// Canned HTTP responses, counting requests.
struct CannedHttp {
    body: Result<String, HttpError>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl HttpClient for CannedHttp {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.body.clone().map(String::into_bytes)
    }
}

/// Runner for sessions that never reach the package manager.
struct NoProcesses;

impl CommandRunner for NoProcesses {
    fn run(&self, spec: &CommandSpec, _timeout: Option<Duration>) -> io::Result<CommandOutput> {
        panic!("unexpected process: {}", spec);
    }
}

struct NoIndex;

impl LatestVersionSource for NoIndex {
    fn latest_version(&self, _package: &str) -> Option<String> {
        None
    }
}

#[derive(Default)]
struct Calls {
    footprints: Vec<FootprintRequest>,
    symbols: Vec<SymbolRequest>,
}

/// Writes a footprint file the way the real library would.
#[derive(Clone, Default)]
struct WritingLibrary {
    calls: Rc<RefCell<Calls>>,
}

impl GenerationLibrary for WritingLibrary {
    fn create_footprint(&self, request: &FootprintRequest) -> Result<GenerationResult, GenerationError> {
        self.calls.borrow_mut().footprints.push(request.clone());
        let dir = request.output_dir.join(&request.footprint_lib);
        std::fs::create_dir_all(&dir).map_err(|e| GenerationError::Launch(e.to_string()))?;
        std::fs::write(dir.join("SOT-23-5.kicad_mod"), "(footprint \"SOT-23-5\")")
            .map_err(|e| GenerationError::Launch(e.to_string()))?;
        Ok(GenerationResult {
            footprint_qualified_name: format!("{}:SOT-23-5", request.footprint_lib),
            datasheet_link: Some("https://example.com/ds.pdf".to_string()),
        })
    }

    fn create_symbol(&self, request: &SymbolRequest) -> Result<(), GenerationError> {
        self.calls.borrow_mut().symbols.push(request.clone());
        Ok(())
    }
}

struct Binder(WritingLibrary);

impl BindingResolver for Binder {
    fn bind(&self) -> Result<LibraryBinding, BindingError> {
        Ok(LibraryBinding::bound(self.0.clone()))
    }
}

struct Fixture {
    session: Session,
    library: WritingLibrary,
    requests: Arc<Mutex<Vec<String>>>,
}

fn fixture(body: Result<&str, HttpError>) -> Fixture {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let http = CannedHttp {
        body: body.map(str::to_string),
        requests: requests.clone(),
    };
    let bootstrap = Bootstrapper::new(
        BootstrapConfig::default(),
        Box::new(Some(InterpreterCandidate::new("/usr/bin/python3"))),
        Arc::new(NoProcesses),
        Arc::new(NoIndex),
    );
    let library = WritingLibrary::default();
    let session = Session::new(
        ConfigFile::default(),
        Box::new(CatalogClient::new(http)),
        bootstrap,
        Box::new(Binder(library.clone())),
    );
    Fixture {
        session,
        library,
        requests,
    }
}

struct Clipboard {
    available: bool,
    text: Vec<String>,
}

impl TransientChannel for Clipboard {
    fn open(&mut self) -> bool {
        self.available
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.text.push(text.to_string());
        Ok(())
    }

    fn close(&mut self) {}
}

#[derive(Default)]
struct Board {
    placed: Vec<(PathBuf, String, Placement)>,
}

impl HostDocument for Board {
    fn document_dir(&self) -> Option<PathBuf> {
        None
    }

    fn load_footprint(&mut self, library_path: &Path, component_name: &str, at: Placement) -> Result<(), String> {
        self.placed
            .push((library_path.to_path_buf(), component_name.to_string(), at));
        Ok(())
    }

    fn refresh(&mut self) {}
}

#[test]
fn project_acquisition_routes_catalog_records() {
    let board_dir = TempDir::new().unwrap();
    let mut fx = fixture(Ok(C326215_BODY));

    let acquisition = fx
        .session
        .acquire("C326215", AcquireMode::ProjectLibrary, Some(board_dir.path()))
        .unwrap();

    assert_eq!(
        *fx.requests.lock().unwrap(),
        vec!["https://easyeda.com/api/products/C326215/svgs".to_string()]
    );

    let calls = fx.library.calls.borrow();
    assert_eq!(calls.footprints[0].footprint_uuid, "fp1");
    assert!(calls.footprints[0].skip_existing);
    assert_eq!(calls.symbols[0].symbol_uuids, vec!["sym1", "sym2"]);
    assert_eq!(calls.symbols[0].footprint_reference, "jlc:SOT-23-5");

    let library_path = board_dir.path().join("JLC2KiCad_lib").join("footprint");
    assert_eq!(acquisition.part.library_path, library_path);
    assert_eq!(acquisition.part.component_name, "SOT-23-5");
    assert!(acquisition.part.footprint_file().exists());
}

#[test]
fn empty_part_makes_no_request() {
    let mut fx = fixture(Ok(C326215_BODY));

    let err = fx
        .session
        .acquire("", AcquireMode::Clipboard, None)
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Validation);
    assert!(fx.requests.lock().unwrap().is_empty());
}

#[test]
fn unknown_part_writes_nothing() {
    let board_dir = TempDir::new().unwrap();
    let mut fx = fixture(Ok(r#"{"success": false, "message": "no such product"}"#));

    let err = fx
        .session
        .acquire("C999999999", AcquireMode::ProjectLibrary, Some(board_dir.path()))
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::NotFound);
    assert!(err.user_message().contains("C999999999"));
    assert!(fx.library.calls.borrow().footprints.is_empty());
    assert_eq!(std::fs::read_dir(board_dir.path()).unwrap().count(), 0);
}

#[test]
fn network_failure_is_not_not_found() {
    let mut fx = fixture(Err(HttpError::Transport {
        url: "https://easyeda.com".to_string(),
        reason: "dns error".to_string(),
    }));

    let err = fx
        .session
        .acquire("C326215", AcquireMode::Clipboard, None)
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::NetworkFailure);
}

#[test]
fn clipboard_delivery_uses_exactly_one_path() {
    for available in [true, false] {
        let mut fx = fixture(Ok(C326215_BODY));
        let acquisition = fx
            .session
            .acquire("C326215", AcquireMode::Clipboard, None)
            .unwrap();
        assert!(fx.library.calls.borrow().symbols.is_empty());

        let mut clipboard = Clipboard {
            available,
            text: Vec::new(),
        };
        let mut board = Board::default();
        let outcome = fx
            .session
            .deliver(&acquisition, &mut clipboard, &mut board)
            .unwrap();

        assert_eq!(clipboard.text.len() + board.placed.len(), 1);
        match outcome {
            DeliveryOutcome::Transient { component_name } => {
                assert!(available);
                assert_eq!(component_name, "SOT-23-5");
                assert_eq!(clipboard.text[0], "(footprint \"SOT-23-5\")");
            }
            DeliveryOutcome::Placed { at, .. } => {
                assert!(!available);
                assert_eq!(at, Placement::ORIGIN);
                assert_eq!(board.placed[0].0, acquisition.part.library_path);
            }
        }
    }
}
