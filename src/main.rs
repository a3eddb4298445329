use mimalloc::MiMalloc;
use smoovim::nvim::RedrawEvent;
use smoovim::{Editor, Neovim, Settings, UiOptions};
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

#[global_allocator]
static GLOBAL_ALLOCATOR: MiMalloc = MiMalloc;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Render-thread parking spot; the I/O thread raises it on every flush.
struct FrameSignal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl FrameSignal {
    fn new() -> Self {
        Self {
            raised: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn raise(&self) {
        let mut raised = self.raised.lock().unwrap_or_else(|e| e.into_inner());
        *raised = true;
        self.cond.notify_one();
    }

    fn wait(&self, timeout: Duration) {
        let mut raised = self.raised.lock().unwrap_or_else(|e| e.into_inner());
        if !*raised {
            let (next, _) = self
                .cond
                .wait_timeout(raised, timeout)
                .unwrap_or_else(|e| e.into_inner());
            raised = next;
        }
        *raised = false;
    }
}

fn main() {
    env_logger::init();

    let signal = Arc::new(FrameSignal::new());
    let wakeup = {
        let signal = signal.clone();
        move || signal.raise()
    };

    let mut nvim = match std::env::args().nth(1) {
        Some(path) => Neovim::connect_socket(Path::new(&path), wakeup),
        None => Neovim::spawn_embedded("nvim", wakeup),
    }
    .unwrap_or_else(|error| {
        eprintln!("failed to reach the backend: {}", error);
        std::process::exit(1);
    });

    if let Err(error) = nvim.attach(80, 24, UiOptions::default()) {
        eprintln!("attach failed: {}", error);
        std::process::exit(1);
    }

    let _ = nvim.command("set cmdheight=0");
    let _ = nvim.try_resize(80, 24);

    let mut editor = Editor::new(Settings::default());
    let mut events: Vec<RedrawEvent> = Vec::new();
    let mut last_tick = Instant::now();

    loop {
        signal.wait(FRAME_INTERVAL);

        nvim.drain_events(&mut events);
        for event in events.drain(..) {
            editor.handle_event(event);
        }

        let now = Instant::now();
        let dt = (now - last_tick).as_secs_f32();
        last_tick = now;
        let animating = editor.animate(dt);

        let frame = editor.frame();
        if frame.status().exited {
            log::info!("backend exited");
            break;
        }

        log::debug!(
            "frame: '{}', {} windows, cursor at {:?}, animating: {}",
            frame.title(),
            frame.windows().count(),
            frame.cursor().map(|c| c.position),
            animating
        );
    }

    nvim.stop();
}
