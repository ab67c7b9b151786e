//
// Copyright (c) The netconfd Contributors
//
// SPDX-License-Identifier: MIT
//

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};

use netconfd_datastore::{DatastoreSession, DatastoreType};

// Per-session server state.
//
// Each NETCONF session owns one of these. RPC execution is serialized
// through an `rpc-in-use` flag guarded by a mutex/condvar pair: the
// orchestrator checks the state out for the lifetime of one RPC, and any
// concurrent dispatch on the same session blocks until it is returned.
pub struct Session {
    inner: Mutex<SessionInner>,
    rpc_cv: Condvar,
}

struct SessionInner {
    rpc_in_use: bool,
    // Present whenever no RPC is in flight.
    state: Option<SessionState>,
}

pub struct SessionState {
    pub(crate) backend: Box<dyn DatastoreSession>,
    pub(crate) datastore: DatastoreType,
    pub(crate) config_only: bool,
    // The candidate datastore has diverged from running and must not be
    // re-based on refresh.
    pub(crate) candidate_changed: bool,
}

// Exclusive access to the session state for the duration of one RPC.
pub(crate) struct RpcGuard<'a> {
    session: &'a Session,
    state: Option<SessionState>,
}

// ===== impl Session =====

impl Session {
    // Creates a session bound to the running datastore.
    pub fn new(backend: Box<dyn DatastoreSession>) -> Session {
        Session {
            inner: Mutex::new(SessionInner {
                rpc_in_use: false,
                state: Some(SessionState {
                    backend,
                    datastore: DatastoreType::Running,
                    config_only: false,
                    candidate_changed: false,
                }),
            }),
            rpc_cv: Condvar::new(),
        }
    }

    pub(crate) fn begin_rpc(&self) -> RpcGuard<'_> {
        let mut inner = self.inner.lock().unwrap();
        while inner.rpc_in_use {
            inner = self.rpc_cv.wait(inner).unwrap();
        }
        inner.rpc_in_use = true;
        let state = inner.state.take().unwrap();
        RpcGuard {
            session: self,
            state: Some(state),
        }
    }

    // Records whether the session has staged changes in the candidate
    // datastore. Called by the write path; the read path uses the flag to
    // decide whether the candidate may be re-based on running.
    pub fn set_candidate_changed(&self, changed: bool) {
        let mut guard = self.begin_rpc();
        guard.candidate_changed = changed;
    }
}

// ===== impl RpcGuard =====

impl Deref for RpcGuard<'_> {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        self.state.as_ref().unwrap()
    }
}

impl DerefMut for RpcGuard<'_> {
    fn deref_mut(&mut self) -> &mut SessionState {
        self.state.as_mut().unwrap()
    }
}

impl Drop for RpcGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.session.inner.lock().unwrap();
        inner.state = self.state.take();
        inner.rpc_in_use = false;
        self.session.rpc_cv.notify_one();
    }
}
