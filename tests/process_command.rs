// tests/process_command.rs

use std::ffi::OsStr;
use std::path::PathBuf;

use scriptd::exec::process_runner::build_command;
use scriptd::registry::ScriptDefinition;

fn definition(path: PathBuf, interpreter: Option<&str>) -> ScriptDefinition {
    ScriptDefinition::new("Test", path, "RUN", vec!["--x".to_string()])
        .expect("absolute path")
        .with_interpreter(interpreter.map(str::to_string))
}

#[test]
fn interpreter_gets_the_script_path_then_args() {
    let path = std::env::temp_dir().join("test.py");
    let def = definition(path.clone(), Some("python3"));
    let cmd = build_command(&def, &["--y".to_string()]);
    let std_cmd = cmd.as_std();

    assert_eq!(std_cmd.get_program(), OsStr::new("python3"));
    let args: Vec<&OsStr> = std_cmd.get_args().collect();
    assert_eq!(args, vec![path.as_os_str(), OsStr::new("--y")]);

    let env: Vec<_> = std_cmd.get_envs().collect();
    assert!(env.contains(&(OsStr::new("PYTHONIOENCODING"), Some(OsStr::new("utf-8")))));
    assert!(env.contains(&(OsStr::new("PYTHONUTF8"), Some(OsStr::new("1")))));
}

#[test]
fn without_interpreter_the_script_is_the_program() {
    let path = std::env::temp_dir().join("run.sh");
    let def = definition(path.clone(), None);
    let cmd = build_command(&def, &[]);

    assert_eq!(cmd.as_std().get_program(), path.as_os_str());
    assert_eq!(cmd.as_std().get_args().count(), 0);
}

#[cfg(unix)]
#[test]
fn non_utf8_path_is_launched_unmangled() {
    use std::os::unix::ffi::OsStrExt;

    let path = PathBuf::from(OsStr::from_bytes(b"/srv/scripts/\xffscript.sh"));
    let def = definition(path.clone(), Some("sh"));
    assert!(def.id.as_str().contains('\u{FFFD}'), "id is the lossy form");

    let cmd = build_command(&def, &[]);
    let args: Vec<&OsStr> = cmd.as_std().get_args().collect();
    assert_eq!(args, vec![path.as_os_str()]);
}
