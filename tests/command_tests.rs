use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use fieldview::command::{Command, CommandQueue, QueueError};
use fieldview::shader::Interpolation;

#[test]
fn send_blocks_until_render_thread_replies() {
    let (tx, rx) = CommandQueue::bounded(4);
    let producer = thread::spawn(move || {
        let first = tx.send(Command::parse("interp left bicubic").unwrap()).unwrap();
        let second = tx.send(Command::Redraw).unwrap();
        (first, second)
    });

    let mut seen = Vec::new();
    while seen.len() < 2 {
        rx.drain(8, |command| {
            let reply = match &command {
                Command::Configure { panel, delta } => {
                    assert_eq!(delta.interpolation, Some(Interpolation::Bicubic));
                    Ok(format!("{panel}: configured"))
                }
                Command::Redraw => Err("nothing to redraw".to_string()),
                other => panic!("unexpected {other:?}"),
            };
            seen.push(command);
            reply
        });
        thread::sleep(Duration::from_millis(1));
    }

    let (first, second) = producer.join().unwrap();
    assert_eq!(first, Ok("left: configured".to_string()));
    assert_eq!(second, Err("nothing to redraw".to_string()));
}

#[test]
fn waker_runs_on_every_enqueue() {
    let (tx, rx) = CommandQueue::bounded(8);
    let wakes = Arc::new(AtomicUsize::new(0));
    {
        let wakes = Arc::clone(&wakes);
        rx.set_waker(move || {
            wakes.fetch_add(1, Ordering::SeqCst);
        });
    }
    tx.post(Command::Redraw).unwrap();
    tx.clone().post(Command::Quit).unwrap();
    assert_eq!(wakes.load(Ordering::SeqCst), 2);

    let mut order = Vec::new();
    assert_eq!(
        rx.drain(1, |c| {
            order.push(c);
            Ok(String::new())
        }),
        1
    );
    assert!(!rx.is_empty());
    rx.drain(10, |c| {
        order.push(c);
        Ok(String::new())
    });
    assert!(rx.is_empty());
    assert!(matches!(order[..], [Command::Redraw, Command::Quit]));
}

#[test]
fn dropped_receiver_closes_the_queue() {
    let (tx, rx) = CommandQueue::bounded(1);
    drop(rx);
    assert_eq!(tx.post(Command::Redraw), Err(QueueError::Closed));
    assert_eq!(tx.send(Command::Redraw), Err(QueueError::Closed));
}

#[test]
fn shell_lines_parse_into_commands() {
    assert!(matches!(Command::parse("quit"), Ok(Command::Quit)));
    assert!(matches!(Command::parse("  exit "), Ok(Command::Quit)));
    let Ok(Command::SetRange { vmin, vmax, .. }) = Command::parse("range p -1 auto") else {
        panic!("range should parse");
    };
    assert_eq!((vmin, vmax), (Some(-1.0), None));
    let Ok(Command::Configure { panel, delta }) = Command::parse("grid p 4 4 2") else {
        panic!("grid should parse");
    };
    assert_eq!(panel, "p");
    assert_eq!(delta.gridsize, Some([4.0, 4.0, 2.0]));

    let Ok(Command::Configure { delta, .. }) = Command::parse("cmap p hot") else {
        panic!("cmap should parse");
    };
    assert_eq!(delta.colormap.unwrap().unwrap().name(), "hot");

    assert!(Command::parse("light p maybe").is_err());
    assert!(Command::parse("dance p").is_err());
}
