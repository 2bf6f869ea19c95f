use evtimer::{EpollReactor, Timer, TimerBuilder};

use std::cell::Cell;
use std::rc::Rc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let reactor = Rc::new(EpollReactor::new()?);
    let ticks = Rc::new(Cell::new(0u32));
    let mut timer = Timer::new();

    TimerBuilder::with_data(ticks.clone())
        .reactor(&reactor)
        .callback({
            let reactor = Rc::downgrade(&reactor);
            move |timer, ticks| {
                ticks.set(ticks.get() + 1);
                println!("tick {} on timer fd {}", ticks.get(), timer.fd());

                if ticks.get() == 5 {
                    if let Some(reactor) = reactor.upgrade() {
                        reactor.stop();
                    }
                }
            }
        })
        .create(&mut timer)?;

    timer.start(200)?;
    reactor.run()?;

    timer.destroy()?;
    println!("done after {} ticks", ticks.get());

    Ok(())
}
