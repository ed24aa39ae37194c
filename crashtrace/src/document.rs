//! Structured-document serializer/deserializer (spec.md §4.9, §6).
//!
//! Every dialect maps to a fixed JSON object shape; key names are part of
//! the wire contract and must not drift. Deserialization is strict about
//! the `"type"` tag and each frame/thread's required shape, and lenient
//! about unknown keys (ignored by construction — we only ever read the
//! keys we know).

use serde_json::{json, Map, Value};

use crate::error::{DocumentError, DocumentErrorKind};
use crate::frame::{
    CoreDumpFrame, DebuggerFrame, Frame, JsFrame, KernelOopsFrame, ManagedExceptionFrame,
    ManagedFrame, ManagedMethodFrame, ScriptFrame,
};
use crate::stacktrace::{
    CoreDumpStacktrace, DebuggerStacktrace, JsStacktrace, KernelOopsStacktrace,
    ManagedStacktrace, ScriptStacktrace, Stacktrace, TaintFlags,
};
use crate::tag::Tag;
use crate::thread::{CoreDumpThread, DebuggerThread, LibraryMapping, ManagedThread, Thread};

/// Serializes a stacktrace to its structured document form. Infallible:
/// every in-memory value has a valid document representation.
pub fn to_document(st: &Stacktrace) -> Value {
    let mut obj = match st {
        Stacktrace::Debugger(s) => debugger_to_doc(s),
        Stacktrace::CoreDump(s) => coredump_to_doc(s),
        Stacktrace::KernelOops(s) => koops_to_doc(s),
        Stacktrace::Script(s) => script_to_doc(s),
        Stacktrace::Managed(s) => managed_to_doc(s),
        Stacktrace::Js(s) => js_to_doc(s),
    };
    obj.insert("type".to_string(), json!(st.tag().as_str()));
    Value::Object(obj)
}

/// Deserializes a stacktrace of dialect `tag` from its document form,
/// rejecting documents whose `"type"` disagrees and documents that violate
/// a structural invariant of the model.
pub fn from_document(tag: Tag, doc: &Value) -> Result<Stacktrace, DocumentError> {
    let doc_tag = doc
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| shape_err("type", "a tag string"))?;
    if doc_tag != tag.as_str() {
        return Err(DocumentError::new(DocumentErrorKind::UnknownTag(
            doc_tag.to_string(),
        )));
    }

    let st = match tag {
        Tag::Debugger => Stacktrace::Debugger(debugger_from_doc(doc)?),
        Tag::CoreDump => Stacktrace::CoreDump(coredump_from_doc(doc)?),
        Tag::KernelOops => Stacktrace::KernelOops(koops_from_doc(doc)?),
        Tag::Script => Stacktrace::Script(script_from_doc(doc)?),
        Tag::Managed => Stacktrace::Managed(managed_from_doc(doc)?),
        Tag::Js => Stacktrace::Js(js_from_doc(doc)?),
    };
    validate(&st)?;
    Ok(st)
}

fn shape_err(path: impl Into<String>, expected: &'static str) -> DocumentError {
    DocumentError::shape(path, expected)
}

fn req_str(doc: &Value, key: &str, path: &str) -> Result<String, DocumentError> {
    doc.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| shape_err(path, "a string"))
}

fn opt_str(doc: &Value, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(str::to_string)
}

fn req_u64(doc: &Value, key: &str, path: &str) -> Result<u64, DocumentError> {
    doc.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| shape_err(path, "a non-negative integer"))
}

fn opt_u64(doc: &Value, key: &str) -> Option<u64> {
    doc.get(key).and_then(Value::as_u64)
}

fn req_u32(doc: &Value, key: &str, path: &str) -> Result<u32, DocumentError> {
    req_u64(doc, key, path).map(|v| v as u32)
}

fn opt_u32(doc: &Value, key: &str) -> Option<u32> {
    opt_u64(doc, key).map(|v| v as u32)
}

fn req_i64(doc: &Value, key: &str, path: &str) -> Result<i64, DocumentError> {
    doc.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| shape_err(path, "an integer"))
}

fn opt_i64(doc: &Value, key: &str) -> Option<i64> {
    doc.get(key).and_then(Value::as_i64)
}

fn opt_bool(doc: &Value, key: &str) -> bool {
    doc.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn req_array<'a>(doc: &'a Value, key: &str, path: &str) -> Result<&'a Vec<Value>, DocumentError> {
    doc.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| shape_err(path, "an array"))
}

fn opt_array<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    doc.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// --- Debugger -------------------------------------------------------------

fn debugger_frame_to_doc(f: &DebuggerFrame) -> Value {
    let mut m = Map::new();
    m.insert("frame_number".into(), json!(f.frame_number));
    if let Some(v) = &f.function_name {
        m.insert("function_name".into(), json!(v));
    }
    if let Some(v) = &f.function_type {
        m.insert("function_type".into(), json!(v));
    }
    m.insert("arguments".into(), json!(f.arguments));
    if let Some(v) = &f.source_file {
        m.insert("source_file".into(), json!(v));
    }
    if let Some(v) = f.source_line {
        m.insert("source_line".into(), json!(v));
    }
    if let Some(v) = f.address {
        m.insert("address".into(), json!(v));
    }
    if let Some(v) = &f.library_name {
        m.insert("library_name".into(), json!(v));
    }
    m.insert("signal_handler".into(), json!(f.signal_handler));
    Value::Object(m)
}

fn debugger_frame_from_doc(doc: &Value, path: &str) -> Result<DebuggerFrame, DocumentError> {
    Ok(DebuggerFrame {
        frame_number: req_u32(doc, "frame_number", &format!("{path}.frame_number"))?,
        function_name: opt_str(doc, "function_name"),
        function_type: opt_str(doc, "function_type"),
        arguments: opt_str(doc, "arguments").unwrap_or_default(),
        source_file: opt_str(doc, "source_file"),
        source_line: opt_u32(doc, "source_line"),
        address: opt_u64(doc, "address"),
        library_name: opt_str(doc, "library_name"),
        signal_handler: opt_bool(doc, "signal_handler"),
    })
}

fn library_mapping_to_doc(m: &LibraryMapping) -> Value {
    let mut obj = Map::new();
    obj.insert("from".into(), json!(m.from));
    obj.insert("to".into(), json!(m.to));
    obj.insert("filename".into(), json!(m.filename));
    if let Some(v) = m.symbols_loaded {
        obj.insert("symbols_loaded".into(), json!(v));
    }
    Value::Object(obj)
}

fn library_mapping_from_doc(doc: &Value, path: &str) -> Result<LibraryMapping, DocumentError> {
    Ok(LibraryMapping {
        from: req_u64(doc, "from", &format!("{path}.from"))?,
        to: req_u64(doc, "to", &format!("{path}.to"))?,
        filename: req_str(doc, "filename", &format!("{path}.filename"))?,
        symbols_loaded: doc.get("symbols_loaded").and_then(Value::as_bool),
    })
}

fn debugger_thread_to_doc(t: &DebuggerThread) -> Value {
    let mut obj = Map::new();
    obj.insert("number".into(), json!(t.number));
    obj.insert("tid".into(), json!(t.tid));
    obj.insert(
        "frames".into(),
        Value::Array(
            t.frames
                .iter()
                .map(|f| match f {
                    Frame::Debugger(f) => debugger_frame_to_doc(f),
                    _ => unreachable!("debugger thread holds only debugger frames"),
                })
                .collect(),
        ),
    );
    Value::Object(obj)
}

fn debugger_thread_from_doc(doc: &Value, path: &str) -> Result<DebuggerThread, DocumentError> {
    let frames_doc = req_array(doc, "frames", &format!("{path}.frames"))?;
    let mut frames = Vec::with_capacity(frames_doc.len());
    for (i, fd) in frames_doc.iter().enumerate() {
        frames.push(Frame::Debugger(debugger_frame_from_doc(
            fd,
            &format!("{path}.frames[{i}]"),
        )?));
    }
    Ok(DebuggerThread {
        number: req_u32(doc, "number", &format!("{path}.number"))?,
        tid: req_u32(doc, "tid", &format!("{path}.tid"))?,
        frames,
        library_table: None,
    })
}

fn debugger_to_doc(s: &DebuggerStacktrace) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert(
        "threads".into(),
        Value::Array(
            s.threads
                .iter()
                .map(|t| match t {
                    Thread::Debugger(t) => debugger_thread_to_doc(t),
                    _ => unreachable!("debugger stacktrace holds only debugger threads"),
                })
                .collect(),
        ),
    );
    if let Some(cf) = &s.crash_frame {
        obj.insert("crash_frame".into(), debugger_frame_to_doc(cf));
    }
    if !s.library_table.is_empty() {
        obj.insert(
            "library_table".into(),
            Value::Array(s.library_table.iter().map(library_mapping_to_doc).collect()),
        );
    }
    obj
}

fn debugger_from_doc(doc: &Value) -> Result<DebuggerStacktrace, DocumentError> {
    let threads_doc = req_array(doc, "threads", "threads")?;
    let mut threads = Vec::with_capacity(threads_doc.len());
    for (i, td) in threads_doc.iter().enumerate() {
        threads.push(Thread::Debugger(debugger_thread_from_doc(
            td,
            &format!("threads[{i}]"),
        )?));
    }
    let crash_frame = match doc.get("crash_frame") {
        Some(cf) => Some(debugger_frame_from_doc(cf, "crash_frame")?),
        None => None,
    };
    let library_table_doc = opt_array(doc, "library_table");
    let mut library_table = Vec::with_capacity(library_table_doc.len());
    for (i, ld) in library_table_doc.iter().enumerate() {
        library_table.push(library_mapping_from_doc(
            ld,
            &format!("library_table[{i}]"),
        )?);
    }
    Ok(DebuggerStacktrace {
        threads,
        crash_frame,
        library_table,
    })
}

// --- CoreDump --------------------------------------------------------------

fn coredump_frame_to_doc(f: &CoreDumpFrame) -> Value {
    let mut m = Map::new();
    if let Some(v) = f.address {
        m.insert("address".into(), json!(v));
    }
    if let Some(v) = &f.build_id {
        m.insert("build_id".into(), json!(v));
    }
    if let Some(v) = f.build_id_offset {
        m.insert("build_id_offset".into(), json!(v));
    }
    if let Some(v) = &f.function_name {
        m.insert("function_name".into(), json!(v));
    }
    if let Some(v) = &f.file_name {
        m.insert("file_name".into(), json!(v));
    }
    if let Some(v) = &f.fingerprint {
        m.insert("fingerprint".into(), json!(v));
    }
    m.insert("fingerprint_hashed".into(), json!(f.fingerprint_hashed));
    Value::Object(m)
}

fn coredump_frame_from_doc(doc: &Value) -> Result<CoreDumpFrame, DocumentError> {
    Ok(CoreDumpFrame {
        address: opt_u64(doc, "address"),
        build_id: opt_str(doc, "build_id"),
        build_id_offset: opt_u64(doc, "build_id_offset"),
        function_name: opt_str(doc, "function_name"),
        file_name: opt_str(doc, "file_name"),
        fingerprint: opt_str(doc, "fingerprint"),
        fingerprint_hashed: opt_bool(doc, "fingerprint_hashed"),
    })
}

fn coredump_thread_to_doc(t: &CoreDumpThread) -> Value {
    let mut obj = Map::new();
    obj.insert("thread_id".into(), json!(t.thread_id));
    obj.insert(
        "frames".into(),
        Value::Array(
            t.frames
                .iter()
                .map(|f| match f {
                    Frame::CoreDump(f) => coredump_frame_to_doc(f),
                    _ => unreachable!("core-dump thread holds only core-dump frames"),
                })
                .collect(),
        ),
    );
    Value::Object(obj)
}

fn coredump_thread_from_doc(doc: &Value, path: &str) -> Result<CoreDumpThread, DocumentError> {
    let frames_doc = req_array(doc, "frames", &format!("{path}.frames"))?;
    let mut frames = Vec::with_capacity(frames_doc.len());
    for fd in frames_doc {
        frames.push(Frame::CoreDump(coredump_frame_from_doc(fd)?));
    }
    Ok(CoreDumpThread {
        thread_id: req_i64(doc, "thread_id", &format!("{path}.thread_id"))?,
        frames,
    })
}

fn coredump_to_doc(s: &CoreDumpStacktrace) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("signal".into(), json!(s.signal));
    obj.insert("executable".into(), json!(s.executable));
    obj.insert(
        "threads".into(),
        Value::Array(
            s.threads
                .iter()
                .map(|t| match t {
                    Thread::CoreDump(t) => coredump_thread_to_doc(t),
                    _ => unreachable!("core-dump stacktrace holds only core-dump threads"),
                })
                .collect(),
        ),
    );
    if let Some(id) = s.crash_thread_id {
        obj.insert("crash_thread_id".into(), json!(id));
    }
    obj.insert("only_crash_thread".into(), json!(s.only_crash_thread));
    obj
}

fn coredump_from_doc(doc: &Value) -> Result<CoreDumpStacktrace, DocumentError> {
    let threads_doc = req_array(doc, "threads", "threads")?;
    let mut threads = Vec::with_capacity(threads_doc.len());
    for (i, td) in threads_doc.iter().enumerate() {
        threads.push(Thread::CoreDump(coredump_thread_from_doc(
            td,
            &format!("threads[{i}]"),
        )?));
    }
    Ok(CoreDumpStacktrace {
        signal: req_u64(doc, "signal", "signal")? as u16,
        executable: opt_str(doc, "executable").unwrap_or_default(),
        threads,
        crash_thread_id: opt_i64(doc, "crash_thread_id"),
        only_crash_thread: opt_bool(doc, "only_crash_thread"),
    })
}

// --- KernelOops --------------------------------------------------------------

fn taint_to_doc(t: &TaintFlags) -> Value {
    json!({
        "proprietary_module": t.proprietary_module,
        "out_of_tree": t.out_of_tree,
        "forced_module": t.forced_module,
        "forced_removal": t.forced_removal,
        "smp_unsafe": t.smp_unsafe,
        "machine_check": t.machine_check,
        "page_release": t.page_release,
        "userspace": t.userspace,
        "died_recently": t.died_recently,
        "acpi_overridden": t.acpi_overridden,
        "warning": t.warning,
        "staging_driver": t.staging_driver,
        "firmware_workaround": t.firmware_workaround,
    })
}

fn taint_from_doc(doc: &Value) -> TaintFlags {
    TaintFlags {
        proprietary_module: opt_bool(doc, "proprietary_module"),
        out_of_tree: opt_bool(doc, "out_of_tree"),
        forced_module: opt_bool(doc, "forced_module"),
        forced_removal: opt_bool(doc, "forced_removal"),
        smp_unsafe: opt_bool(doc, "smp_unsafe"),
        machine_check: opt_bool(doc, "machine_check"),
        page_release: opt_bool(doc, "page_release"),
        userspace: opt_bool(doc, "userspace"),
        died_recently: opt_bool(doc, "died_recently"),
        acpi_overridden: opt_bool(doc, "acpi_overridden"),
        warning: opt_bool(doc, "warning"),
        staging_driver: opt_bool(doc, "staging_driver"),
        firmware_workaround: opt_bool(doc, "firmware_workaround"),
    }
}

fn koops_frame_to_doc(f: &KernelOopsFrame) -> Value {
    let mut m = Map::new();
    m.insert("address".into(), json!(f.address));
    m.insert("reliable".into(), json!(f.reliable));
    if let Some(v) = &f.function_name {
        m.insert("function_name".into(), json!(v));
    }
    if let Some(v) = f.function_offset {
        m.insert("function_offset".into(), json!(v));
    }
    if let Some(v) = f.function_length {
        m.insert("function_length".into(), json!(v));
    }
    if let Some(v) = &f.module_name {
        m.insert("module_name".into(), json!(v));
    }
    if let Some(v) = f.caller_address {
        m.insert("caller_address".into(), json!(v));
    }
    if let Some(v) = &f.caller_function {
        m.insert("caller_function".into(), json!(v));
    }
    if let Some(v) = f.caller_offset {
        m.insert("caller_offset".into(), json!(v));
    }
    if let Some(v) = f.caller_length {
        m.insert("caller_length".into(), json!(v));
    }
    if let Some(v) = &f.caller_module {
        m.insert("caller_module".into(), json!(v));
    }
    if let Some(v) = &f.special_stack_tag {
        m.insert("special_stack_tag".into(), json!(v));
    }
    Value::Object(m)
}

fn koops_frame_from_doc(doc: &Value, path: &str) -> Result<KernelOopsFrame, DocumentError> {
    Ok(KernelOopsFrame {
        address: req_u64(doc, "address", &format!("{path}.address"))?,
        reliable: opt_bool(doc, "reliable"),
        function_name: opt_str(doc, "function_name"),
        function_offset: opt_u64(doc, "function_offset"),
        function_length: opt_u64(doc, "function_length"),
        module_name: opt_str(doc, "module_name"),
        caller_address: opt_u64(doc, "caller_address"),
        caller_function: opt_str(doc, "caller_function"),
        caller_offset: opt_u64(doc, "caller_offset"),
        caller_length: opt_u64(doc, "caller_length"),
        caller_module: opt_str(doc, "caller_module"),
        special_stack_tag: opt_str(doc, "special_stack_tag"),
    })
}

fn koops_to_doc(s: &KernelOopsStacktrace) -> Map<String, Value> {
    let mut obj = Map::new();
    if let Some(v) = &s.kernel_version {
        obj.insert("version".into(), json!(v));
    }
    obj.insert("taint_flags".into(), taint_to_doc(&s.taint));
    obj.insert("modules".into(), json!(s.modules));
    obj.insert(
        "frames".into(),
        Value::Array(s.frames.iter().map(koops_frame_to_doc).collect()),
    );
    obj
}

fn koops_from_doc(doc: &Value) -> Result<KernelOopsStacktrace, DocumentError> {
    let frames_doc = req_array(doc, "frames", "frames")?;
    let mut frames = Vec::with_capacity(frames_doc.len());
    for (i, fd) in frames_doc.iter().enumerate() {
        frames.push(koops_frame_from_doc(fd, &format!("frames[{i}]"))?);
    }
    let modules = opt_array(doc, "modules")
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    Ok(KernelOopsStacktrace {
        kernel_version: opt_str(doc, "version"),
        taint: doc
            .get("taint_flags")
            .map(taint_from_doc)
            .unwrap_or_default(),
        modules,
        frames,
    })
}

// --- Script --------------------------------------------------------------

fn script_frame_to_doc(f: &ScriptFrame) -> Value {
    let mut m = Map::new();
    m.insert("file_name".into(), json!(f.file_name));
    m.insert("special_file".into(), json!(f.special_file));
    m.insert("file_line".into(), json!(f.file_line));
    m.insert("function_name".into(), json!(f.function_name));
    m.insert("special_function".into(), json!(f.special_function));
    if let Some(v) = &f.source_line_contents {
        m.insert("source_line_contents".into(), json!(v));
    }
    Value::Object(m)
}

fn script_frame_from_doc(doc: &Value, path: &str) -> Result<ScriptFrame, DocumentError> {
    Ok(ScriptFrame {
        file_name: req_str(doc, "file_name", &format!("{path}.file_name"))?,
        special_file: opt_bool(doc, "special_file"),
        file_line: req_u32(doc, "file_line", &format!("{path}.file_line"))?,
        function_name: req_str(doc, "function_name", &format!("{path}.function_name"))?,
        special_function: opt_bool(doc, "special_function"),
        source_line_contents: opt_str(doc, "source_line_contents"),
    })
}

fn script_to_doc(s: &ScriptStacktrace) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("exception_class".into(), json!(s.exception_class));
    if let Some(v) = &s.exception_message {
        obj.insert("exception_message".into(), json!(v));
    }
    obj.insert(
        "frames".into(),
        Value::Array(s.frames.iter().map(script_frame_to_doc).collect()),
    );
    obj
}

fn script_from_doc(doc: &Value) -> Result<ScriptStacktrace, DocumentError> {
    let frames_doc = req_array(doc, "frames", "frames")?;
    let mut frames = Vec::with_capacity(frames_doc.len());
    for (i, fd) in frames_doc.iter().enumerate() {
        frames.push(script_frame_from_doc(fd, &format!("frames[{i}]"))?);
    }
    Ok(ScriptStacktrace {
        exception_class: req_str(doc, "exception_class", "exception_class")?,
        exception_message: opt_str(doc, "exception_message"),
        frames,
    })
}

// --- Managed --------------------------------------------------------------
//
// The document shape is flat (spec.md §6: one "Managed frame" shape with an
// `is_exception` boolean), while the in-memory model splits method
// activations and exception headers into distinct variants (spec.md §3);
// these two functions are the boundary between the shapes.

fn managed_frame_to_doc(f: &ManagedFrame) -> Value {
    let mut m = Map::new();
    match f {
        ManagedFrame::Method(mf) => {
            m.insert("name".into(), json!(mf.name));
            if let Some(v) = &mf.source_file {
                m.insert("file_name".into(), json!(v));
            }
            if let Some(v) = mf.source_line {
                m.insert("file_line".into(), json!(v));
            }
            if let Some(v) = &mf.class_path {
                m.insert("class_path".into(), json!(v));
            }
            m.insert("is_native".into(), json!(mf.is_native));
            m.insert("is_exception".into(), json!(false));
        }
        ManagedFrame::Exception(ef) => {
            m.insert("name".into(), json!(ef.type_name));
            m.insert("is_native".into(), json!(false));
            m.insert("is_exception".into(), json!(true));
            if let Some(v) = &ef.message {
                m.insert("message".into(), json!(v));
            }
            if let Some(v) = ef.folded {
                m.insert("folded".into(), json!(v));
            }
        }
    }
    Value::Object(m)
}

fn managed_frame_from_doc(doc: &Value, path: &str) -> Result<Frame, DocumentError> {
    let name = req_str(doc, "name", &format!("{path}.name"))?;
    if opt_bool(doc, "is_exception") {
        Ok(Frame::Managed(ManagedFrame::Exception(
            ManagedExceptionFrame {
                type_name: name,
                message: opt_str(doc, "message"),
                folded: opt_u32(doc, "folded"),
            },
        )))
    } else {
        Ok(Frame::Managed(ManagedFrame::Method(ManagedMethodFrame {
            name,
            source_file: opt_str(doc, "file_name"),
            source_line: opt_u32(doc, "file_line"),
            class_path: opt_str(doc, "class_path"),
            is_native: opt_bool(doc, "is_native"),
        })))
    }
}

fn managed_thread_to_doc(t: &ManagedThread) -> Value {
    let mut obj = Map::new();
    if let Some(v) = &t.name {
        obj.insert("name".into(), json!(v));
    }
    obj.insert(
        "frames".into(),
        Value::Array(
            t.frames
                .iter()
                .map(|f| match f {
                    Frame::Managed(m) => managed_frame_to_doc(m),
                    _ => unreachable!("managed thread holds only managed frames"),
                })
                .collect(),
        ),
    );
    Value::Object(obj)
}

fn managed_thread_from_doc(doc: &Value, path: &str) -> Result<ManagedThread, DocumentError> {
    let frames_doc = req_array(doc, "frames", &format!("{path}.frames"))?;
    let mut frames = Vec::with_capacity(frames_doc.len());
    for (i, fd) in frames_doc.iter().enumerate() {
        frames.push(managed_frame_from_doc(fd, &format!("{path}.frames[{i}]"))?);
    }
    Ok(ManagedThread {
        name: opt_str(doc, "name"),
        frames,
    })
}

fn managed_to_doc(s: &ManagedStacktrace) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert(
        "threads".into(),
        Value::Array(
            s.threads
                .iter()
                .map(|t| match t {
                    Thread::Managed(t) => managed_thread_to_doc(t),
                    _ => unreachable!("managed stacktrace holds only managed threads"),
                })
                .collect(),
        ),
    );
    obj
}

fn managed_from_doc(doc: &Value) -> Result<ManagedStacktrace, DocumentError> {
    let threads_doc = req_array(doc, "threads", "threads")?;
    let mut threads = Vec::with_capacity(threads_doc.len());
    for (i, td) in threads_doc.iter().enumerate() {
        threads.push(Thread::Managed(managed_thread_from_doc(
            td,
            &format!("threads[{i}]"),
        )?));
    }
    Ok(ManagedStacktrace { threads })
}

// --- Js --------------------------------------------------------------

fn js_frame_to_doc(f: &JsFrame) -> Value {
    let mut m = Map::new();
    if let Some(v) = &f.file_name {
        m.insert("file_name".into(), json!(v));
    }
    m.insert("file_line".into(), json!(f.file_line));
    m.insert("file_column".into(), json!(f.file_column));
    if let Some(v) = &f.function_name {
        m.insert("function_name".into(), json!(v));
    }
    m.insert("is_native".into(), json!(f.is_native));
    Value::Object(m)
}

fn js_frame_from_doc(doc: &Value) -> JsFrame {
    JsFrame {
        file_name: opt_str(doc, "file_name"),
        file_line: opt_u32(doc, "file_line").unwrap_or(0),
        file_column: opt_u32(doc, "file_column").unwrap_or(0),
        function_name: opt_str(doc, "function_name"),
        is_native: opt_bool(doc, "is_native"),
    }
}

fn js_to_doc(s: &JsStacktrace) -> Map<String, Value> {
    let mut obj = Map::new();
    if let Some(v) = &s.exception_name {
        obj.insert("exception_name".into(), json!(v));
    }
    if let Some(v) = &s.exception_message {
        obj.insert("exception_message".into(), json!(v));
    }
    obj.insert(
        "frames".into(),
        Value::Array(s.frames.iter().map(js_frame_to_doc).collect()),
    );
    obj
}

fn js_from_doc(doc: &Value) -> Result<JsStacktrace, DocumentError> {
    let frames_doc = req_array(doc, "frames", "frames")?;
    Ok(JsStacktrace {
        exception_name: opt_str(doc, "exception_name"),
        exception_message: opt_str(doc, "exception_message"),
        frames: frames_doc.iter().map(js_frame_from_doc).collect(),
    })
}

// --- Invariant validation --------------------------------------------------

fn validate(st: &Stacktrace) -> Result<(), DocumentError> {
    match st {
        Stacktrace::Debugger(s) if s.threads.is_empty() => {
            return Err(invariant("a debugger stacktrace needs at least one thread"));
        }
        Stacktrace::CoreDump(s) if s.threads.is_empty() => {
            return Err(invariant("a core-dump stacktrace needs at least one thread"));
        }
        Stacktrace::KernelOops(s) if s.frames.is_empty() => {
            return Err(invariant("a kernel-oops stacktrace needs at least one frame"));
        }
        Stacktrace::Script(s) if s.frames.is_empty() => {
            return Err(invariant("a script stacktrace needs at least one frame"));
        }
        Stacktrace::Js(s) if s.frames.is_empty() => {
            return Err(invariant("a js stacktrace needs at least one frame"));
        }
        Stacktrace::Managed(s) => {
            if s.threads.is_empty() {
                return Err(invariant("a managed stacktrace needs at least one thread"));
            }
            for t in &s.threads {
                let Thread::Managed(t) = t else { continue };
                let has_exception = t
                    .frames
                    .iter()
                    .any(|f| matches!(f, Frame::Managed(ManagedFrame::Exception(_))));
                if !has_exception {
                    return Err(invariant(
                        "a managed thread needs at least one exception header",
                    ));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn invariant(which: &'static str) -> DocumentError {
    DocumentError::new(DocumentErrorKind::InvariantViolation(which))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::DebuggerFrame;
    use crate::thread::DebuggerThread;
    use similar_asserts::assert_eq;

    #[test]
    fn debugger_round_trips() {
        let st = Stacktrace::Debugger(DebuggerStacktrace {
            threads: vec![Thread::Debugger(DebuggerThread {
                number: 1,
                tid: 100,
                frames: vec![Frame::Debugger(DebuggerFrame {
                    frame_number: 0,
                    function_name: Some("repeat".into()),
                    address: Some(0x322a2362b9),
                    source_file: Some("pixman-bits-image.c".into()),
                    source_line: Some(145),
                    ..Default::default()
                })],
                library_table: None,
            })],
            crash_frame: None,
            library_table: vec![],
        });
        let doc = to_document(&st);
        let back = from_document(Tag::Debugger, &doc).unwrap();
        assert_eq!(st, back);
    }

    #[test]
    fn koops_document_uses_spec_key_names() {
        let st = Stacktrace::KernelOops(KernelOopsStacktrace {
            kernel_version: Some("5.10.0".into()),
            taint: TaintFlags {
                warning: true,
                ..Default::default()
            },
            modules: vec!["ext4".into()],
            frames: vec![KernelOopsFrame {
                address: 0xffffffff81234567,
                reliable: true,
                function_name: Some("vfs_read".into()),
                ..Default::default()
            }],
        });
        let doc = to_document(&st);
        assert_eq!(doc["version"], json!("5.10.0"));
        assert!(doc["taint_flags"]["warning"].as_bool().unwrap());
        assert_eq!(doc["modules"], json!(["ext4"]));
        assert!(doc["frames"].is_array());

        let back = from_document(Tag::KernelOops, &doc).unwrap();
        assert_eq!(st, back);
    }

    #[test]
    fn managed_exception_and_method_share_flat_shape() {
        let st = Stacktrace::Managed(ManagedStacktrace {
            threads: vec![Thread::Managed(ManagedThread {
                name: Some("main".into()),
                frames: vec![
                    Frame::Managed(ManagedFrame::Exception(ManagedExceptionFrame {
                        type_name: "java.lang.RuntimeException".into(),
                        message: Some("boom".into()),
                        folded: None,
                    })),
                    Frame::Managed(ManagedFrame::Method(ManagedMethodFrame {
                        name: "Foo.bar".into(),
                        source_file: Some("Foo.java".into()),
                        source_line: Some(10),
                        class_path: Some("Foo".into()),
                        is_native: false,
                    })),
                ],
            })],
        });
        let doc = to_document(&st);
        let frames = doc["threads"][0]["frames"].as_array().unwrap();
        assert_eq!(frames[0]["is_exception"], json!(true));
        assert_eq!(frames[1]["is_exception"], json!(false));

        let back = from_document(Tag::Managed, &doc).unwrap();
        assert_eq!(st, back);
    }

    #[test]
    fn missing_type_is_a_shape_error() {
        let doc = json!({ "threads": [] });
        let err = from_document(Tag::Debugger, &doc).unwrap_err();
        assert!(matches!(
            err.kind(),
            DocumentErrorKind::DocumentShape { .. }
        ));
    }

    #[test]
    fn mismatched_type_is_unknown_tag() {
        let doc = json!({ "type": "gdb", "threads": [] });
        let err = from_document(Tag::Managed, &doc).unwrap_err();
        assert!(matches!(err.kind(), DocumentErrorKind::UnknownTag(_)));
    }

    #[test]
    fn managed_thread_without_exception_header_is_invariant_violation() {
        let doc = json!({
            "type": "java",
            "threads": [
                { "name": "main", "frames": [
                    { "name": "Foo.bar", "is_native": false, "is_exception": false }
                ] }
            ]
        });
        let err = from_document(Tag::Managed, &doc).unwrap_err();
        assert!(matches!(
            err.kind(),
            DocumentErrorKind::InvariantViolation(_)
        ));
    }
}
