use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// Resolve after `ms` milliseconds on the browser timer
pub async fn sleep(ms: f64) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms as i32);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

/// One-shot timer that is cleared when re-armed, so only the last call fires
pub struct Debouncer {
    delay_ms: i32,
    handle: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl Debouncer {
    pub fn new(delay_ms: i32) -> Rc<Self> {
        Rc::new(Self {
            delay_ms,
            handle: Cell::new(None),
            callback: RefCell::new(None),
        })
    }

    pub fn schedule<F>(self: &Rc<Self>, f: F)
    where
        F: FnOnce() + 'static,
    {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Some(handle) = self.handle.take() {
            window.clear_timeout_with_handle(handle);
        }

        let this = Rc::downgrade(self);
        let mut f = Some(f);
        let callback = Closure::wrap(Box::new(move || {
            if let Some(this) = this.upgrade() {
                this.handle.set(None);
            }
            if let Some(f) = f.take() {
                f();
            }
        }) as Box<dyn FnMut()>);

        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            self.delay_ms,
        ) {
            Ok(handle) => self.handle.set(Some(handle)),
            Err(e) => log::warn!("Failed to arm timer: {:?}", e),
        }
        // Replacing drops the previous closure; its timer was cleared above
        *self.callback.borrow_mut() = Some(callback);
    }

    pub fn cancel(&self) {
        if let (Some(handle), Some(window)) = (self.handle.take(), web_sys::window()) {
            window.clear_timeout_with_handle(handle);
        }
    }
}
