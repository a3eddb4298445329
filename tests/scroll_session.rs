//! A full scroll transaction driven end to end: scripted backend,
//! I/O thread, event queue, editor state and frame reads.

use smoovim::nvim::msg::{write_array_len, write_sint, write_str, write_uint, Payload, RpcMessage};
use smoovim::{Editor, Neovim, Settings, UiOptions};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::mpsc;
use std::time::Duration;

const WIDTH: u64 = 40;
const HEIGHT: u64 = 12;

fn answer_attach(stream: &mut UnixStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let msgid = loop {
        {
            let mut slice = buf.as_slice();
            match RpcMessage::decode(&mut slice) {
                Ok(RpcMessage::Request { msgid, method, .. }) => {
                    assert_eq!(method, "nvim_ui_attach");
                    break msgid;
                }
                Ok(other) => panic!("unexpected message {:?}", other),
                Err(ref error) if error.kind() == std::io::ErrorKind::UnexpectedEof => {}
                Err(error) => panic!("malformed request: {}", error),
            }
        }
        let n = stream.read(&mut chunk).expect("backend read failed");
        assert!(n > 0);
        buf.extend_from_slice(&chunk[..n]);
    };

    let mut reply = Vec::new();
    RpcMessage::Response {
        msgid,
        error: Payload::Nil,
        result: Payload::Nil,
    }
    .encode(&mut reply);
    stream.write_all(&reply).unwrap();
}

/// The initial screen: a resize, one line of content per row, flush.
fn initial_redraw() -> Vec<u8> {
    let mut buf = Vec::new();
    write_array_len(&mut buf, 3);
    write_uint(&mut buf, 2);
    write_str(&mut buf, "redraw");
    write_array_len(&mut buf, 3);

    write_array_len(&mut buf, 2);
    write_str(&mut buf, "grid_resize");
    write_array_len(&mut buf, 3);
    write_uint(&mut buf, 2);
    write_uint(&mut buf, WIDTH);
    write_uint(&mut buf, HEIGHT);

    write_array_len(&mut buf, 1 + HEIGHT as u32);
    write_str(&mut buf, "grid_line");
    for row in 0..HEIGHT {
        write_array_len(&mut buf, 4);
        write_uint(&mut buf, 2);
        write_uint(&mut buf, row);
        write_uint(&mut buf, 0);
        write_array_len(&mut buf, 1);
        write_array_len(&mut buf, 3);
        write_str(&mut buf, "x");
        write_uint(&mut buf, 10 + row);
        write_uint(&mut buf, WIDTH);
    }

    write_array_len(&mut buf, 2);
    write_str(&mut buf, "flush");
    write_array_len(&mut buf, 0);
    buf
}

/// A one-line scroll: region move, refilled vacated row, the viewport
/// delta with its zero-delta confirmation, flush.
fn scroll_redraw() -> Vec<u8> {
    let mut buf = Vec::new();
    write_array_len(&mut buf, 3);
    write_uint(&mut buf, 2);
    write_str(&mut buf, "redraw");
    write_array_len(&mut buf, 4);

    write_array_len(&mut buf, 2);
    write_str(&mut buf, "grid_scroll");
    write_array_len(&mut buf, 7);
    write_uint(&mut buf, 2);
    write_uint(&mut buf, 0);
    write_uint(&mut buf, HEIGHT);
    write_uint(&mut buf, 0);
    write_uint(&mut buf, WIDTH);
    write_sint(&mut buf, 1);
    write_uint(&mut buf, 0);

    write_array_len(&mut buf, 2);
    write_str(&mut buf, "grid_line");
    write_array_len(&mut buf, 4);
    write_uint(&mut buf, 2);
    write_uint(&mut buf, HEIGHT - 1);
    write_uint(&mut buf, 0);
    write_array_len(&mut buf, 1);
    write_array_len(&mut buf, 3);
    write_str(&mut buf, "y");
    write_uint(&mut buf, 99);
    write_uint(&mut buf, WIDTH);

    // The delta and its confirmation event.
    write_array_len(&mut buf, 3);
    write_str(&mut buf, "win_viewport");
    for delta in &[1i64, 0] {
        write_array_len(&mut buf, 8);
        write_uint(&mut buf, 2);
        write_uint(&mut buf, 1000);
        write_uint(&mut buf, 1);
        write_uint(&mut buf, 13);
        write_uint(&mut buf, 0);
        write_uint(&mut buf, 0);
        write_uint(&mut buf, 100);
        write_sint(&mut buf, *delta);
    }

    write_array_len(&mut buf, 2);
    write_str(&mut buf, "flush");
    write_array_len(&mut buf, 0);
    buf
}

#[test]
fn smooth_scroll_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("nvim.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();

    let backend = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept failed");
        answer_attach(&mut stream);
        stream.write_all(&initial_redraw()).unwrap();
        stream.write_all(&scroll_redraw()).unwrap();

        let mut sink = [0u8; 4096];
        while let Ok(n) = stream.read(&mut sink) {
            if n == 0 {
                break;
            }
        }
    });

    let (wakeup_tx, wakeup_rx) = mpsc::channel::<()>();
    let wakeup = move || {
        let _ = wakeup_tx.send(());
    };

    let mut nvim = Neovim::connect_socket(&socket_path, wakeup).unwrap();
    nvim.attach(WIDTH, HEIGHT, UiOptions::default()).unwrap();

    // One wakeup per flush.
    wakeup_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    wakeup_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let mut editor = Editor::new(Settings::default());
    let mut events = Vec::new();
    nvim.drain_events(&mut events);
    for event in events.drain(..) {
        editor.handle_event(event);
    }

    {
        let window = editor.window(2).expect("window missing");
        // Live content reflects the completed scroll.
        assert_eq!(window.get_cell(0, 0).unwrap().hl_id, 11);
        assert_eq!(
            window.get_cell(HEIGHT as usize - 1, 0).unwrap().hl_id,
            99
        );
        // The spring was displaced by exactly the scrolled distance and
        // the pre-scroll row is reachable above the viewport.
        assert_eq!(window.scroll_animation.position, -1.0);
        assert!(window.has_valid_scrollback());
        assert_eq!(window.get_scroll_cell(0, 0).unwrap().hl_id, 10);
        assert_eq!(window.get_scroll_cell(1, 0).unwrap().hl_id, 11);
    }

    // The animation settles back to rest without ever overshooting.
    let mut guard = 0;
    while editor.animate(1.0 / 60.0) {
        let position = editor.window(2).unwrap().scroll_animation.position;
        assert!(position <= 0.0);
        guard += 1;
        assert!(guard < 1000, "scroll animation failed to settle");
    }
    assert_eq!(editor.window(2).unwrap().scroll_animation.position, 0.0);

    nvim.stop();
    drop(nvim);
    backend.join().unwrap();
}
