//! WebGL1 background pattern canvas.
//!
//! Draws a full-viewport quad whose fragment shader renders a Chladni plate
//! interference figure from three uniforms: seconds since mount, scroll
//! progress through the owning section, and the drawing buffer resolution.
//! When the context or shaders cannot be created the renderer logs once and
//! mounts nothing; the page runs without the background.

use std::cell::RefCell;
use std::rc::Rc;

use engine::ScrollTimeline;
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::WebGlRenderingContext as GL;
use web_sys::{
    HtmlCanvasElement, HtmlElement, IntersectionObserver, IntersectionObserverEntry,
    WebGlBuffer, WebGlProgram, WebGlShader, WebGlUniformLocation, WebglLoseContext, Window,
};

use crate::frame_loop::FrameLoop;
use crate::{dom, StageError};

const VERTEX_SHADER_SRC: &str = r#"
attribute vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER_SRC: &str = r#"
precision mediump float;

uniform float u_time;
uniform float u_scroll;
uniform vec2 u_resolution;

void main() {
    vec2 p = gl_FragCoord.xy / u_resolution * 2.0 - 1.0;
    float n = 3.0 + floor(u_scroll * 4.0);
    float m = 2.0 + floor(u_scroll * 3.0);
    float t = u_time * 0.25;
    float pi = 3.14159265;
    float wave = cos(n * pi * p.x + t) * cos(m * pi * p.y + t)
               - cos(m * pi * p.x - t) * cos(n * pi * p.y - t);
    float line = 1.0 - smoothstep(0.0, 0.08, abs(wave));
    gl_FragColor = vec4(vec3(line * 0.85), 1.0);
}
"#;

struct PatternShared {
    window: Window,
    canvas: HtmlCanvasElement,
    section: HtmlElement,
    gl: GL,
    program: WebGlProgram,
    vertex_shader: WebGlShader,
    fragment_shader: WebGlShader,
    quad: WebGlBuffer,
    u_time: Option<WebGlUniformLocation>,
    u_scroll: Option<WebGlUniformLocation>,
    u_resolution: Option<WebGlUniformLocation>,
    timeline: RefCell<ScrollTimeline>,
    mounted_at: f64,
}

pub struct PatternRenderer {
    frame_loop: FrameLoop,
    shared: Rc<PatternShared>,
    observer: Option<IntersectionObserver>,
    observer_closure: Option<Closure<dyn FnMut(js_sys::Array)>>,
    disposed: bool,
}

impl PatternRenderer {
    /// Builds the GL pipeline and starts observing canvas visibility. The
    /// loop only runs while the canvas intersects the viewport.
    ///
    /// Returns `Ok(None)` when WebGL is unavailable or the shaders fail to
    /// build; the failure is logged and the page continues without the
    /// pattern.
    pub fn mount(
        window: &Window,
        canvas: HtmlCanvasElement,
        section: HtmlElement,
        scroll_span: f64,
    ) -> Result<Option<Self>, StageError> {
        let timeline = match ScrollTimeline::new(scroll_span) {
            Ok(timeline) => timeline,
            Err(_) => return Err(StageError::BadScrollSpan(scroll_span)),
        };
        let gl = match webgl_context(&canvas) {
            Some(gl) => gl,
            None => {
                warn!("WebGL context unavailable, pattern canvas disabled");
                return Ok(None);
            }
        };
        let pipeline = match build_pipeline(&gl) {
            Ok(pipeline) => pipeline,
            Err(message) => {
                warn!(%message, "pattern shader pipeline failed, canvas disabled");
                return Ok(None);
            }
        };
        let (program, vertex_shader, fragment_shader, quad) = pipeline;

        let u_time = gl.get_uniform_location(&program, "u_time");
        let u_scroll = gl.get_uniform_location(&program, "u_scroll");
        let u_resolution = gl.get_uniform_location(&program, "u_resolution");

        let shared = Rc::new(PatternShared {
            window: window.clone(),
            canvas,
            section,
            gl,
            program,
            vertex_shader,
            fragment_shader,
            quad,
            u_time,
            u_scroll,
            u_resolution,
            timeline: RefCell::new(timeline),
            mounted_at: dom::now_ms(window),
        });

        let frame_loop = FrameLoop::new(window.clone());
        let loop_handle = frame_loop.clone();
        let loop_shared = Rc::clone(&shared);
        let observer_closure = Closure::wrap(Box::new(move |entries: js_sys::Array| {
            let mut visible = false;
            for entry in entries.iter() {
                let entry = entry.unchecked_into::<IntersectionObserverEntry>();
                visible = visible || entry.is_intersecting();
            }
            if visible {
                start_loop(&loop_handle, &loop_shared);
            } else {
                loop_handle.stop();
            }
        }) as Box<dyn FnMut(js_sys::Array)>);
        let observer = IntersectionObserver::new(observer_closure.as_ref().unchecked_ref())?;
        observer.observe(&shared.canvas);

        Ok(Some(Self {
            frame_loop,
            shared,
            observer: Some(observer),
            observer_closure: Some(observer_closure),
            disposed: false,
        }))
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.state() == crate::LoopState::Running
    }

    /// Stops the loop, disconnects the visibility observer, deletes the GL
    /// resources, and asks the driver to release the context.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.frame_loop.dispose();
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.observer_closure = None;

        let gl = &self.shared.gl;
        gl.delete_buffer(Some(&self.shared.quad));
        gl.delete_program(Some(&self.shared.program));
        gl.delete_shader(Some(&self.shared.vertex_shader));
        gl.delete_shader(Some(&self.shared.fragment_shader));
        match gl.get_extension("WEBGL_lose_context") {
            Ok(Some(extension)) => {
                extension.unchecked_into::<WebglLoseContext>().lose_context();
            }
            Ok(None) => debug!("WEBGL_lose_context not supported"),
            Err(err) => debug!(?err, "WEBGL_lose_context lookup failed"),
        }
    }
}

impl Drop for PatternRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn start_loop(frame_loop: &FrameLoop, shared: &Rc<PatternShared>) {
    let shared = Rc::clone(shared);
    frame_loop.start(move |timestamp| draw_frame(&shared, timestamp));
}

fn draw_frame(shared: &PatternShared, timestamp: f64) {
    let gl = &shared.gl;
    let ratio = dom::device_pixel_ratio(&shared.window);
    let width = (f64::from(shared.canvas.client_width()) * ratio).round().max(1.0) as u32;
    let height = (f64::from(shared.canvas.client_height()) * ratio).round().max(1.0) as u32;
    if shared.canvas.width() != width || shared.canvas.height() != height {
        shared.canvas.set_width(width);
        shared.canvas.set_height(height);
        gl.viewport(0, 0, width as i32, height as i32);
    }

    let scroll_y = dom::scroll_y(&shared.window);
    let progress = {
        let mut timeline = shared.timeline.borrow_mut();
        timeline.set_geometry(
            dom::absolute_top(&shared.window, &shared.section),
            dom::viewport_height(&shared.window),
        );
        timeline.progress(scroll_y)
    };

    let elapsed = ((timestamp - shared.mounted_at) / 1000.0).max(0.0);
    gl.uniform1f(shared.u_time.as_ref(), elapsed as f32);
    gl.uniform1f(shared.u_scroll.as_ref(), progress as f32);
    gl.uniform2f(shared.u_resolution.as_ref(), width as f32, height as f32);
    gl.draw_arrays(GL::TRIANGLE_STRIP, 0, 4);
}

fn webgl_context(canvas: &HtmlCanvasElement) -> Option<GL> {
    let context = canvas.get_context("webgl").ok().flatten()?;
    context.dyn_into::<GL>().ok()
}

type Pipeline = (WebGlProgram, WebGlShader, WebGlShader, WebGlBuffer);

fn build_pipeline(gl: &GL) -> Result<Pipeline, String> {
    let vertex_shader = compile_shader(gl, GL::VERTEX_SHADER, VERTEX_SHADER_SRC)?;
    let fragment_shader = compile_shader(gl, GL::FRAGMENT_SHADER, FRAGMENT_SHADER_SRC)?;
    let program = link_program(gl, &vertex_shader, &fragment_shader)?;
    gl.use_program(Some(&program));

    let quad = gl
        .create_buffer()
        .ok_or_else(|| String::from("unable to create quad buffer"))?;
    gl.bind_buffer(GL::ARRAY_BUFFER, Some(&quad));
    let vertices: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
    unsafe {
        let view = js_sys::Float32Array::view(&vertices);
        gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &view, GL::STATIC_DRAW);
    }
    let position = gl.get_attrib_location(&program, "a_position");
    if position < 0 {
        return Err(String::from("a_position attribute missing from program"));
    }
    gl.enable_vertex_attrib_array(position as u32);
    gl.vertex_attrib_pointer_with_i32(position as u32, 2, GL::FLOAT, false, 0, 0);
    Ok((program, vertex_shader, fragment_shader, quad))
}

fn compile_shader(gl: &GL, shader_type: u32, source: &str) -> Result<WebGlShader, String> {
    let shader = gl
        .create_shader(shader_type)
        .ok_or_else(|| String::from("unable to create shader object"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    if gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        Err(gl
            .get_shader_info_log(&shader)
            .unwrap_or_else(|| String::from("unknown shader compile error")))
    }
}

fn link_program(gl: &GL, vertex: &WebGlShader, fragment: &WebGlShader) -> Result<WebGlProgram, String> {
    let program = gl
        .create_program()
        .ok_or_else(|| String::from("unable to create program object"))?;
    gl.attach_shader(&program, vertex);
    gl.attach_shader(&program, fragment);
    gl.link_program(&program);
    if gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        Err(gl
            .get_program_info_log(&program)
            .unwrap_or_else(|| String::from("unknown program link error")))
    }
}
