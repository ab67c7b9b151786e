//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::debug;

use crate::Server;
use crate::session::Session;

// One inbound RPC, as handed over by the session layer.
pub struct Request {
    pub session: Arc<Session>,
    pub rpc: String,
    pub responder: Sender<String>,
}

// Pool of RPC worker threads.
//
// Each request is dispatched to one worker and processed synchronously
// there; requests on the same session serialize on the session's RPC
// lock. Dropping the pool drains and joins the workers.
pub struct Pool {
    tx: Option<Sender<Request>>,
    workers: Vec<JoinHandle<()>>,
}

// ===== impl Pool =====

impl Pool {
    pub fn start(server: Arc<Server>) -> Pool {
        let count = server.config().rpc_workers.max(1);
        let (tx, rx) = unbounded::<Request>();

        let workers = (0..count)
            .map(|id| {
                let server = server.clone();
                let rx = rx.clone();
                std::thread::Builder::new()
                    .name(format!("rpc-worker-{}", id))
                    .spawn(move || worker_loop(server, rx))
                    .expect("failed to spawn RPC worker")
            })
            .collect();

        Pool {
            tx: Some(tx),
            workers,
        }
    }

    // Queues an RPC for execution, returning the channel the reply will
    // arrive on.
    pub fn dispatch(&self, session: Arc<Session>, rpc: String) -> Receiver<String> {
        let (responder, reply_rx) = bounded(1);
        self.tx
            .as_ref()
            .unwrap()
            .send(Request {
                session,
                rpc,
                responder,
            })
            .expect("RPC worker pool is gone");
        reply_rx
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // Closing the channel lets the workers drain and exit.
        self.tx = None;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

// ===== helper functions =====

fn worker_loop(server: Arc<Server>, rx: Receiver<Request>) {
    while let Ok(request) = rx.recv() {
        let reply = server.handle_rpc(&request.session, &request.rpc);
        // The requester may be gone by now; that is not an error.
        let _ = request.responder.send(reply);
    }
    debug!("RPC worker exiting");
}
