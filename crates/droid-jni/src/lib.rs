//! JNI entry points for `com.example.myapp.MainActivity`
//!
//! The activity declares
//!
//! ```java
//! public native void startPython(String pythonHome, String pythonPath, String[] argv);
//! public native void startPython(String pythonHome, String pythonPath, String mainFile);
//! public native int runPython(String pythonHome, String pythonPath, String[] argv);
//! ```
//!
//! The overloaded `startPython` pair is exported under the JNI long names.
//! Both return nothing and report through the log only; `runPython` returns
//! `0` on success or the bridge's status code.

#![allow(non_snake_case)]

mod jni_host;

pub use jni_host::JniHost;

use droid_logger as logger;
use droid_python::{decode_invocation, run_python, BridgeError, BridgeOptions, HostEntry};
use jni::objects::{JObject, JObjectArray, JString};
use jni::sys::jint;
use jni::JNIEnv;
use once_cell::sync::OnceCell;
use std::panic::{self, AssertUnwindSafe};

/// Status returned when the bridge panicked
pub const PANIC_STATUS: jint = -1;

static LOGGING: OnceCell<()> = OnceCell::new();

enum JniEntry<'a, 'local> {
    Single(&'a JString<'local>),
    Argv(&'a JObjectArray<'local>),
}

fn init_logging() {
    LOGGING.get_or_init(|| {
        logger::set_verbosity(1);

        #[cfg(target_os = "android")]
        {
            use tracing_subscriber::prelude::*;

            // stderr is discarded on Android; logcat is the only sink.
            logger::set_no_stdout(true);
            let _ = tracing_subscriber::registry()
                .with(paranoid_android::layer(logger::get_tag()))
                .try_init();
        }
    });
}

/// Options for runs started from the activity
pub fn android_options() -> BridgeOptions {
    BridgeOptions {
        append_working_dir: true,
        capture_output: cfg!(target_os = "android"),
    }
}

fn decode_and_run<'local>(
    env: &mut JNIEnv<'local>,
    python_home: &JString<'local>,
    python_path: &JString<'local>,
    entry: JniEntry<'_, 'local>,
) -> Result<(), BridgeError> {
    init_logging();

    let invocation = {
        let mut host = JniHost::new(env);
        let entry = match entry {
            JniEntry::Single(name) => HostEntry::Single(name),
            JniEntry::Argv(argv) => HostEntry::Argv(argv),
        };
        decode_invocation(&mut host, python_home, python_path, entry)?
    };

    run_python(invocation, android_options())
}

/// Map a run outcome to the status handed back to Java
pub fn status_for(result: Result<(), BridgeError>) -> jint {
    match result {
        Ok(()) => 0,
        Err(e) => {
            logger::error(&format!("Python bootstrap failed: {}", e));
            e.status_code()
        }
    }
}

fn guarded<F>(run: F) -> jint
where
    F: FnOnce() -> Result<(), BridgeError>,
{
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(result) => status_for(result),
        Err(_) => {
            logger::error("Python bootstrap panicked");
            PANIC_STATUS
        }
    }
}

/// `void startPython(String, String, String[])`
#[no_mangle]
pub extern "system" fn Java_com_example_myapp_MainActivity_startPython__Ljava_lang_String_2Ljava_lang_String_2_3Ljava_lang_String_2<
    'local,
>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    python_home: JString<'local>,
    python_path: JString<'local>,
    argv: JObjectArray<'local>,
) {
    guarded(|| decode_and_run(&mut env, &python_home, &python_path, JniEntry::Argv(&argv)));
}

/// `void startPython(String, String, String)`
#[no_mangle]
pub extern "system" fn Java_com_example_myapp_MainActivity_startPython__Ljava_lang_String_2Ljava_lang_String_2Ljava_lang_String_2<
    'local,
>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    python_home: JString<'local>,
    python_path: JString<'local>,
    main_file: JString<'local>,
) {
    guarded(|| {
        decode_and_run(
            &mut env,
            &python_home,
            &python_path,
            JniEntry::Single(&main_file),
        )
    });
}

/// `int runPython(String, String, String[])`
#[no_mangle]
pub extern "system" fn Java_com_example_myapp_MainActivity_runPython<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    python_home: JString<'local>,
    python_path: JString<'local>,
    argv: JObjectArray<'local>,
) -> jint {
    guarded(|| decode_and_run(&mut env, &python_home, &python_path, JniEntry::Argv(&argv)))
}
