use clap::Parser;
use client::game::{OfflineGame, OnlineGame};
use client::input::{self, InputPacer};
use client::network::NetClient;
use client::rendering;
use log::{info, warn};
use macroquad::prelude::{get_fps, get_frame_time, next_frame, Conf};
use shared::protocol::Message;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:9527")]
    server: String,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "2000")]
    connect_timeout: u64,

    /// Simulate extra one-way latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Skip connecting and play both paddles on one keyboard
    #[arg(long)]
    offline: bool,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "pongnet".to_owned(),
        window_width: shared::WINDOW_WIDTH as i32,
        window_height: shared::WINDOW_HEIGHT as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let net = if args.offline {
        None
    } else {
        let timeout = Duration::from_millis(args.connect_timeout);
        let fake_lag = Duration::from_millis(args.fake_ping);
        if args.fake_ping > 0 {
            info!("simulating {}ms extra one-way latency", args.fake_ping);
        }
        match NetClient::connect(&args.server, timeout, fake_lag) {
            Ok(net) => Some(net),
            Err(e) => {
                warn!("connect to {} failed ({}); playing offline", args.server, e);
                None
            }
        }
    };

    match net {
        Some(net) => run_online(net).await,
        None => run_offline().await,
    }
}

async fn run_online(mut net: NetClient) {
    info!("waiting for an opponent...");
    let clock = Instant::now();
    let mut game = OnlineGame::new();
    let mut pacer = InputPacer::new();

    loop {
        let keys = input::sample();
        if keys.quit {
            break;
        }

        // eat server state first: this frame renders the latest snapshot
        // plus local prediction
        while let Some(msg) = net.try_recv() {
            game.handle_message(msg, now_ms(&clock));
        }
        if !net.is_connected() {
            warn!("server connection lost");
            break;
        }

        let local = game
            .role()
            .map(|role| keys.for_role(role))
            .unwrap_or_default();
        game.advance(local, get_frame_time());

        if let Some(role) = game.role() {
            if pacer.should_send(local.mask()) {
                net.send(&Message::PlayerInput {
                    tick: game.last_server_tick(),
                    client_time_ms: now_ms(&clock),
                    input_mask: local.mask(),
                    player_id: role,
                });
            }
        }

        let hud = rendering::hud_line(get_fps(), Some(game.rtt_ms()));
        rendering::draw(&game.render_state(), game.role(), &hud);
        next_frame().await;
    }

    net.shutdown();
}

async fn run_offline() {
    info!("offline mode: W/S moves player 1, Up/Down moves player 2");
    let mut game = OfflineGame::new();

    loop {
        let keys = input::sample();
        if keys.quit {
            break;
        }

        game.advance(keys.primary(), keys.secondary(), get_frame_time());

        let hud = rendering::hud_line(get_fps(), None);
        rendering::draw(&game.render_state(), None, &hud);
        next_frame().await;
    }
}

fn now_ms(clock: &Instant) -> u32 {
    clock.elapsed().as_millis() as u32
}
