//! `pyo3` wrappers over the objects returned by `DaVinciResolveScript`.

use std::any::Any;
use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};

use resolve_bridge_automation_core::{
    ApiError, ApiResult, Clip, Folder, ImportResult, MediaPool, Project, ProjectManager,
    PropertyValue, RenderSettings, ResolveApi, Timeline, TimelineItem, TrackKind,
};

/// Entry object returned by `scriptapp("Resolve")`.
pub struct PyResolve {
    app: Py<PyAny>,
}

impl PyResolve {
    pub fn connect(module_dirs: &[PathBuf]) -> ApiResult<Self> {
        Python::with_gil(|py| {
            let err = |e: PyErr| ApiError::call("scriptapp", e.to_string());

            let sys_path = py
                .import_bound("sys")
                .and_then(|sys| sys.getattr("path"))
                .map_err(err)?;
            for dir in module_dirs.iter().filter(|d| d.is_dir()) {
                sys_path
                    .call_method1("append", (dir.display().to_string(),))
                    .map_err(err)?;
            }

            let module = py.import_bound("DaVinciResolveScript").map_err(err)?;
            let app = module.call_method1("scriptapp", ("Resolve",)).map_err(err)?;
            if app.is_none() {
                return Err(ApiError::call("scriptapp", "Resolve is not running"));
            }
            Ok(Self { app: app.unbind() })
        })
    }
}

fn call_err(method: &str) -> impl Fn(PyErr) -> ApiError + '_ {
    move |e| ApiError::call(method, e.to_string())
}

/// Call `method(*args)` on `obj` and convert the answer with `extract`.
fn invoke<T, A, F>(obj: &Py<PyAny>, method: &str, args: A, extract: F) -> ApiResult<T>
where
    A: IntoPy<Py<PyTuple>>,
    F: for<'py> FnOnce(&Bound<'py, PyAny>) -> PyResult<T>,
{
    Python::with_gil(|py| {
        let target = obj.bind(py);
        if !target.hasattr(method).map_err(call_err(method))? {
            return Err(ApiError::missing_method(method));
        }
        let value = target.call_method1(method, args).map_err(call_err(method))?;
        extract(&value).map_err(|e| ApiError::unexpected(method, e.to_string()))
    })
}

/// `None` for Python `None` or any falsy value.
fn optional_object(value: &Bound<'_, PyAny>) -> PyResult<Option<Py<PyAny>>> {
    if value.is_none() || !value.is_truthy()? {
        return Ok(None);
    }
    Ok(Some(value.clone().unbind()))
}

/// Objects from a returned list; a non-list answer reads as empty.
fn object_list(value: &Bound<'_, PyAny>) -> PyResult<Vec<Py<PyAny>>> {
    match value.downcast::<PyList>() {
        Ok(list) => Ok(list.iter().map(Bound::unbind).collect()),
        Err(_) => {
            if let Ok(dict) = value.downcast::<PyDict>() {
                // GetItemListInTrack and friends return {index: item} on some releases.
                return Ok(dict.values().iter().map(Bound::unbind).collect());
            }
            Ok(Vec::new())
        }
    }
}

fn int_value(value: &Bound<'_, PyAny>) -> PyResult<i64> {
    if let Ok(v) = value.extract::<i64>() {
        return Ok(v);
    }
    let text: String = value.str()?.extract()?;
    text.trim()
        .parse::<f64>()
        .map(|v| v as i64)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

fn handle_of<'a, T: 'static>(any: &'a dyn Any, method: &str) -> ApiResult<&'a T> {
    any.downcast_ref::<T>()
        .ok_or_else(|| ApiError::unexpected(method, "handle from another backend"))
}

impl ResolveApi for PyResolve {
    fn project_manager(&self) -> ApiResult<Option<Box<dyn ProjectManager>>> {
        let obj = invoke(&self.app, "GetProjectManager", (), optional_object)?;
        Ok(obj.map(|obj| Box::new(PyProjectManager { obj }) as Box<dyn ProjectManager>))
    }
}

struct PyProjectManager {
    obj: Py<PyAny>,
}

impl ProjectManager for PyProjectManager {
    fn current_project(&self) -> ApiResult<Option<Box<dyn Project>>> {
        let obj = invoke(&self.obj, "GetCurrentProject", (), optional_object)?;
        Ok(obj.map(|obj| Box::new(PyProject { obj }) as Box<dyn Project>))
    }
}

struct PyProject {
    obj: Py<PyAny>,
}

impl Project for PyProject {
    fn name(&self) -> ApiResult<String> {
        invoke(&self.obj, "GetName", (), |v| v.extract())
    }

    fn current_timeline(&self) -> ApiResult<Option<Box<dyn Timeline>>> {
        let obj = invoke(&self.obj, "GetCurrentTimeline", (), optional_object)?;
        Ok(obj.map(|obj| Box::new(PyTimeline { obj }) as Box<dyn Timeline>))
    }

    fn media_pool(&self) -> ApiResult<Option<Box<dyn MediaPool>>> {
        let obj = invoke(&self.obj, "GetMediaPool", (), optional_object)?;
        Ok(obj.map(|obj| Box::new(PyMediaPool { obj }) as Box<dyn MediaPool>))
    }

    fn render_settings(&self) -> ApiResult<serde_json::Value> {
        let method = "GetRenderSettings";
        let json = invoke(&self.obj, method, (), |v| {
            if !v.is_instance_of::<PyDict>() {
                return Ok(None);
            }
            let dumps = v.py().import_bound("json")?.getattr("dumps")?;
            let kwargs = PyDict::new_bound(v.py());
            kwargs.set_item("default", v.py().get_type_bound::<pyo3::types::PyString>())?;
            dumps.call((v,), Some(&kwargs))?.extract::<String>().map(Some)
        })?;
        match json {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| ApiError::unexpected(method, e.to_string())),
            None => Ok(serde_json::Value::Null),
        }
    }

    fn set_render_settings(&self, settings: &RenderSettings) -> ApiResult<bool> {
        let method = "SetRenderSettings";
        let text = serde_json::to_string(settings)
            .map_err(|e| ApiError::unexpected(method, e.to_string()))?;
        Python::with_gil(|py| {
            let dict = py
                .import_bound("json")
                .and_then(|json| json.call_method1("loads", (text,)))
                .map_err(call_err(method))?;
            let target = self.obj.bind(py);
            if !target.hasattr(method).map_err(call_err(method))? {
                return Err(ApiError::missing_method(method));
            }
            target
                .call_method1(method, (dict,))
                .and_then(|v| v.is_truthy())
                .map_err(call_err(method))
        })
    }

    fn add_render_job(&self) -> ApiResult<Option<String>> {
        invoke(&self.obj, "AddRenderJob", (), |v| {
            if v.is_none() {
                return Ok(None);
            }
            let id: String = v.str()?.extract()?;
            Ok((!id.is_empty()).then_some(id))
        })
    }

    fn start_rendering(&self) -> ApiResult<bool> {
        invoke(&self.obj, "StartRendering", (), |v| v.is_truthy())
    }

    fn is_rendering(&self) -> ApiResult<bool> {
        match invoke(&self.obj, "IsRenderingInProgress", (), |v| v.is_truthy()) {
            Err(ApiError::MissingMethod { .. }) => {
                invoke(&self.obj, "IsRendering", (), |v| v.is_truthy())
            }
            other => other,
        }
    }

    fn project_path(&self) -> ApiResult<Option<String>> {
        invoke(&self.obj, "GetProjectPath", (), |v| {
            if v.is_none() {
                return Ok(None);
            }
            let path: String = v.extract()?;
            Ok((!path.is_empty()).then_some(path))
        })
    }
}

struct PyTimeline {
    obj: Py<PyAny>,
}

impl PyTimeline {
    /// Fallback for releases that only expose `GetMarkInOut()`.
    fn mark_from_in_out(&self, which: &'static str) -> ApiResult<i64> {
        invoke(&self.obj, "GetMarkInOut", (), move |v| {
            let Ok(marks) = v.downcast::<PyDict>() else {
                return Ok(-1);
            };
            let Some(video) = marks.get_item("video")? else {
                return Ok(-1);
            };
            match video.get_item(which) {
                Ok(mark) => int_value(&mark),
                Err(_) => Ok(-1),
            }
        })
    }
}

impl Timeline for PyTimeline {
    fn name(&self) -> ApiResult<String> {
        invoke(&self.obj, "GetName", (), |v| v.extract())
    }

    fn start_frame(&self) -> ApiResult<i64> {
        invoke(&self.obj, "GetStartFrame", (), int_value)
    }

    fn end_frame(&self) -> ApiResult<i64> {
        invoke(&self.obj, "GetEndFrame", (), int_value)
    }

    fn mark_in(&self) -> ApiResult<i64> {
        match invoke(&self.obj, "GetMarkIn", (), int_value) {
            Err(ApiError::MissingMethod { .. }) => self.mark_from_in_out("in"),
            other => other,
        }
    }

    fn mark_out(&self) -> ApiResult<i64> {
        match invoke(&self.obj, "GetMarkOut", (), int_value) {
            Err(ApiError::MissingMethod { .. }) => self.mark_from_in_out("out"),
            other => other,
        }
    }

    fn current_timecode(&self) -> ApiResult<String> {
        invoke(&self.obj, "GetCurrentTimecode", (), |v| v.extract())
    }

    fn setting(&self, key: &str) -> ApiResult<Option<String>> {
        invoke(&self.obj, "GetSetting", (key,), |v| {
            if v.is_none() {
                return Ok(None);
            }
            let text: String = v.str()?.extract()?;
            Ok((!text.is_empty()).then_some(text))
        })
    }

    fn append_clips(&self, clips: &[&dyn Clip]) -> ApiResult<bool> {
        let method = "AppendToTimeline";
        let handles = clips
            .iter()
            .map(|clip| handle_of::<PyClip>(clip.as_any(), method))
            .collect::<ApiResult<Vec<_>>>()?;
        Python::with_gil(|py| {
            let list = PyList::new_bound(py, handles.iter().map(|c| c.obj.clone_ref(py)));
            let target = self.obj.bind(py);
            target
                .call_method1(method, (list,))
                .and_then(|v| v.is_truthy())
                .map_err(call_err(method))
        })
    }

    fn track_count(&self, kind: TrackKind) -> ApiResult<u32> {
        invoke(&self.obj, "GetTrackCount", (kind.as_str(),), |v| {
            int_value(v).map(|n| n.max(0) as u32)
        })
    }

    fn items_in_track(
        &self,
        kind: TrackKind,
        index: u32,
    ) -> ApiResult<Vec<Box<dyn TimelineItem>>> {
        let items = invoke(
            &self.obj,
            "GetItemListInTrack",
            (kind.as_str(), index),
            object_list,
        )?;
        Ok(items
            .into_iter()
            .map(|obj| Box::new(PyTimelineItem { obj }) as Box<dyn TimelineItem>)
            .collect())
    }

    fn set_item_property(
        &self,
        item: &dyn TimelineItem,
        key: &str,
        value: &PropertyValue,
    ) -> ApiResult<bool> {
        let item = handle_of::<PyTimelineItem>(item.as_any(), "SetItemProperty")?;
        Python::with_gil(|py| {
            let arg: PyObject = match value {
                PropertyValue::Int(v) => v.to_object(py),
                PropertyValue::Text(s) => s.to_object(py),
            };
            let timeline = self.obj.bind(py);
            let method = "SetItemProperty";
            let result = if timeline.hasattr(method).map_err(call_err(method))? {
                timeline.call_method1(method, (key, arg, item.obj.clone_ref(py)))
            } else {
                item.obj.bind(py).call_method1("SetProperty", (key, arg))
            };
            let accepted = result
                .and_then(|v| v.is_truthy())
                .map_err(call_err(method))?;
            if accepted {
                Ok(true)
            } else {
                Err(ApiError::call(method, format!("{key} was rejected")))
            }
        })
    }
}

struct PyTimelineItem {
    obj: Py<PyAny>,
}

impl TimelineItem for PyTimelineItem {
    fn name(&self) -> ApiResult<String> {
        invoke(&self.obj, "GetName", (), |v| v.extract())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct PyMediaPool {
    obj: Py<PyAny>,
}

impl MediaPool for PyMediaPool {
    fn root_folder(&self) -> ApiResult<Option<Box<dyn Folder>>> {
        let obj = invoke(&self.obj, "GetRootFolder", (), optional_object)?;
        Ok(obj.map(|obj| Box::new(PyFolder { obj }) as Box<dyn Folder>))
    }

    fn add_sub_folder(
        &self,
        parent: &dyn Folder,
        name: &str,
    ) -> ApiResult<Option<Box<dyn Folder>>> {
        let method = "AddSubFolder";
        let parent = handle_of::<PyFolder>(parent.as_any(), method)?;
        let obj = Python::with_gil(|py| {
            let pool = self.obj.bind(py);
            let created = pool
                .call_method1(method, (parent.obj.clone_ref(py), name))
                .map_err(call_err(method))?;
            optional_object(&created).map_err(call_err(method))
        })?;
        Ok(obj.map(|obj| Box::new(PyFolder { obj }) as Box<dyn Folder>))
    }

    fn current_folder(&self) -> ApiResult<Option<Box<dyn Folder>>> {
        let obj = invoke(&self.obj, "GetCurrentFolder", (), optional_object)?;
        Ok(obj.map(|obj| Box::new(PyFolder { obj }) as Box<dyn Folder>))
    }

    fn set_current_folder(&self, folder: &dyn Folder) -> ApiResult<bool> {
        let method = "SetCurrentFolder";
        let folder = handle_of::<PyFolder>(folder.as_any(), method)?;
        Python::with_gil(|py| {
            self.obj
                .bind(py)
                .call_method1(method, (folder.obj.clone_ref(py),))
                .and_then(|v| v.is_truthy())
                .map_err(call_err(method))
        })
    }

    fn import_to_current(&self, paths: &[PathBuf]) -> ApiResult<ImportResult> {
        let method = "ImportMedia";
        let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        Python::with_gil(|py| {
            let result = self
                .obj
                .bind(py)
                .call_method1(method, (PyList::new_bound(py, paths),))
                .map_err(call_err(method))?;
            if result.is_none() || !result.is_truthy().map_err(call_err(method))? {
                return Ok(ImportResult::Nothing);
            }
            if result.is_instance_of::<PyList>() {
                let clips = object_list(&result)
                    .map_err(call_err(method))?
                    .into_iter()
                    .map(|obj| Box::new(PyClip { obj }) as Box<dyn Clip>)
                    .collect();
                return Ok(ImportResult::Clips(clips));
            }
            Ok(ImportResult::Acknowledged)
        })
    }
}

struct PyFolder {
    obj: Py<PyAny>,
}

impl Folder for PyFolder {
    fn name(&self) -> ApiResult<String> {
        invoke(&self.obj, "GetName", (), |v| v.extract())
    }

    fn sub_folders(&self) -> ApiResult<Vec<Box<dyn Folder>>> {
        let objs = invoke(&self.obj, "GetSubFolderList", (), object_list)?;
        Ok(objs
            .into_iter()
            .map(|obj| Box::new(PyFolder { obj }) as Box<dyn Folder>)
            .collect())
    }

    fn clips(&self) -> ApiResult<Vec<Box<dyn Clip>>> {
        let objs = invoke(&self.obj, "GetClipList", (), object_list)?;
        Ok(objs
            .into_iter()
            .map(|obj| Box::new(PyClip { obj }) as Box<dyn Clip>)
            .collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct PyClip {
    obj: Py<PyAny>,
}

impl Clip for PyClip {
    fn name(&self) -> ApiResult<String> {
        invoke(&self.obj, "GetName", (), |v| v.extract())
    }

    fn media_id(&self) -> ApiResult<String> {
        invoke(&self.obj, "GetMediaId", (), |v| v.str()?.extract::<String>())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
