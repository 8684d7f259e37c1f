use std::collections::HashMap;

use parking_lot::Mutex;
pub use puffin;
use puffin::{FrameData, FrameSinkId, NanoSecond, ScopeId};

pub fn new_frame() {
    profile_function!();
    puffin::set_scopes_on(true);
    puffin::GlobalProfiler::lock().new_frame();
}

/// Turns scopes on and logs the top level scopes of every finished frame under the
/// `athena_profiling` target. A frame finishes on the next call to [`new_frame`].
pub fn log_frames() -> FrameSinkId {
    puffin::set_scopes_on(true);

    let names = Mutex::new(HashMap::new());
    puffin::GlobalProfiler::lock().add_sink(Box::new(move |frame| {
        let scopes = top_level_scopes(&frame, &mut names.lock());

        log::info!(
            target: "athena_profiling",
            "frame {}: {} scopes in {:.3}ms",
            frame.meta().frame_index,
            frame.meta().num_scopes,
            frame.duration_ns() as f64 * 1e-6
        );
        for (name, duration_ns) in scopes {
            log::info!(
                target: "athena_profiling",
                "{} took {:.3}ms",
                name,
                duration_ns as f64 * 1e-6
            );
        }
    }))
}

/// Names and durations of the scopes recorded at depth zero in `frame`, across all threads.
/// Scope details only arrive once, in the frame that registered them, so `names` has to
/// outlive a single frame.
pub fn top_level_scopes(
    frame: &FrameData,
    names: &mut HashMap<ScopeId, String>,
) -> Vec<(String, NanoSecond)> {
    for details in &frame.scope_delta {
        if let Some(scope_id) = details.scope_id {
            names.insert(scope_id, details.name().to_string());
        }
    }

    let Ok(unpacked) = frame.unpacked() else {
        return Vec::new();
    };

    let mut scopes = Vec::new();
    for stream_info in unpacked.thread_streams.values() {
        let Ok(top_scopes) = puffin::Reader::from_start(&stream_info.stream).read_top_scopes()
        else {
            continue;
        };

        for scope in top_scopes {
            let name = names
                .get(&scope.id)
                .cloned()
                .unwrap_or_else(|| "unknown".to_owned());
            scopes.push((name, scope.record.duration_ns));
        }
    }
    scopes
}

#[allow(dead_code)]
pub struct Marker(Option<puffin::ProfilerScope>);

impl Marker {
    /// Creates a new [`Marker`]. Note: the passed [`ScopeId`] should only be constructed once.
    #[inline(always)]
    pub fn new(_id: &'static str, puffin_scope_id: ScopeId, context: &str) -> Self {
        let puffin_scope = if puffin::are_scopes_on() {
            Some(puffin::ProfilerScope::new(puffin_scope_id, context))
        } else {
            None
        };

        Self(puffin_scope)
    }
}

#[macro_export]
macro_rules! function_name {
    () => {
        $crate::puffin::clean_function_name($crate::puffin::current_function_name!())
    };
}

#[macro_export]
macro_rules! file_name {
    () => {
        $crate::puffin::short_file_name(file!())
    };
}

#[macro_export]
macro_rules! profile_scope_owned {
    ($name:expr) => {
        $crate::profile_scope_owned!($name, "")
    };
    ($name:expr, $data:expr) => {{
        static FUNCTION_NAME: std::sync::OnceLock<String> = std::sync::OnceLock::new();
        let function_name = FUNCTION_NAME.get_or_init(|| $crate::function_name!());

        static SCOPE_ID: std::sync::OnceLock<$crate::puffin::ScopeId> =
            std::sync::OnceLock::new();
        let scope_id = SCOPE_ID.get_or_init(|| {
            $crate::puffin::ThreadProfiler::call(|tp| {
                tp.register_named_scope($name, function_name, $crate::file_name!(), line!())
            })
        });
        $crate::Marker::new($name, *scope_id, $data)
    }};
}

#[macro_export]
macro_rules! profile_function_owned {
    () => {
        $crate::profile_function_owned!("")
    };
    ($data:expr) => {{
        static FUNCTION_NAME: std::sync::OnceLock<String> = std::sync::OnceLock::new();
        let function_name = FUNCTION_NAME.get_or_init(|| $crate::function_name!());

        static SCOPE_ID: std::sync::OnceLock<$crate::puffin::ScopeId> =
            std::sync::OnceLock::new();
        let scope_id = SCOPE_ID.get_or_init(|| {
            $crate::puffin::ThreadProfiler::call(|tp| {
                tp.register_function_scope(function_name, $crate::file_name!(), line!())
            })
        });
        $crate::Marker::new(function_name, *scope_id, $data)
    }};
}

#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        $crate::profile_scope!($name, "")
    };
    ($name:expr, $data:expr) => {
        let _profiler_marker = $crate::profile_scope_owned!($name, $data);
    };
}

#[macro_export]
macro_rules! profile_function {
    () => {
        $crate::profile_function!("")
    };
    ($data:expr) => {
        let _profiler_marker = $crate::profile_function_owned!($data);
    };
}
