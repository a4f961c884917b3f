//! The two ordered asynchronous cookie sequences around a job.
//!
//! The read phase runs before the handler sees the request: fetch the
//! cookie list, run the bulk policy and the handler's per-cookie gate,
//! and merge the Cookie header when everything passes. The write phase
//! runs after headers are produced and before headers-complete is
//! signaled: each Set-Cookie line is policy-checked and persisted with
//! exactly one asynchronous store call outstanding at a time, so the
//! store observes response cookies strictly in order.
//!
//! Every continuation step re-checks the job status; a job that was
//! canceled mid-sequence routes to the cancellation path instead of
//! continuing.

use crate::base::status::RequestStatus;
use crate::cookies::canonicalcookie::CanonicalCookie;
use crate::cookies::store::CookieOptions;
use crate::job::bridge::{notify_canceled, JobShared, JobState};
use crate::urlrequest::request::LoadFlags;
use http::header::{HeaderValue, COOKIE};
use std::sync::Arc;

/// Entry point of the read phase.
pub(crate) fn add_cookie_header_and_start(shared: &Arc<JobShared>) {
    let (url, send_cookies) = {
        let mut core = shared.core.lock().unwrap();
        // Report IO-pending no matter what: the consumer hears about
        // the started handler asynchronously.
        core.status = RequestStatus::IoPending;
        (
            core.request.url().clone(),
            !core
                .request
                .load_flags()
                .contains(LoadFlags::DO_NOT_SEND_COOKIES),
        )
    };

    if !send_cookies {
        do_start_transaction(shared);
        return;
    }

    let weak = Arc::downgrade(shared);
    shared.cookie_store.get_all_for_url(
        &url,
        Box::new(move |cookies| {
            if let Some(shared) = weak.upgrade() {
                check_cookie_policy_and_load(&shared, cookies);
            }
        }),
    );
}

fn check_cookie_policy_and_load(shared: &Arc<JobShared>, cookies: Vec<CanonicalCookie>) {
    let request = shared.core.lock().unwrap().request.clone();

    let mut can_get_cookies = shared.cookie_policy.can_get_cookies(&request, &cookies);
    if can_get_cookies {
        for cookie in &cookies {
            if !shared.handler.can_get_cookie(cookie) {
                can_get_cookies = false;
                break;
            }
        }
    }

    if can_get_cookies {
        do_load_cookies(shared);
    } else {
        // A rejection here is not a failure: the handler starts, just
        // without the Cookie header.
        do_start_transaction(shared);
    }
}

fn do_load_cookies(shared: &Arc<JobShared>) {
    let url = shared.core.lock().unwrap().request.url().clone();
    let weak = Arc::downgrade(shared);
    shared.cookie_store.cookie_line_for_url(
        &url,
        CookieOptions::with_httponly(),
        Box::new(move |line| {
            if let Some(shared) = weak.upgrade() {
                on_cookies_loaded(&shared, line);
            }
        }),
    );
}

fn on_cookies_loaded(shared: &Arc<JobShared>, cookie_line: String) {
    if !cookie_line.is_empty() {
        let mut core = shared.core.lock().unwrap();
        if let Ok(value) = HeaderValue::from_str(&cookie_line) {
            core.request.headers_mut().insert(COOKIE, value);
        }
    }
    do_start_transaction(shared);
}

fn do_start_transaction(shared: &Arc<JobShared>) {
    // We may have been canceled while retrieving cookies.
    let in_progress = shared.core.lock().unwrap().status.is_success();
    if in_progress {
        start_transaction(shared);
    } else {
        notify_canceled(shared);
    }
}

fn start_transaction(shared: &Arc<JobShared>) {
    // The one-shot token that will be invoked when header information
    // is available.
    let token = crate::job::token::HeadersAvailable::new(
        Arc::downgrade(shared),
        shared.runner.clone(),
    );
    let request = {
        let mut core = shared.core.lock().unwrap();
        core.headers_token = Some(token.clone());
        core.request.clone()
    };

    // Handler decides whether to process the request.
    let accepted = shared.handler.process_request(&request, token);
    if !accepted {
        notify_canceled(shared);
    }
}

/// Entry point of the write phase, invoked once headers are pulled.
pub(crate) fn save_cookies_and_notify_headers_complete(shared: &Arc<JobShared>) {
    let skip = {
        let mut core = shared.core.lock().unwrap();
        if core
            .request
            .load_flags()
            .contains(LoadFlags::DO_NOT_SAVE_COOKIES)
        {
            // Clear the IO-pending status.
            core.status = RequestStatus::Success;
            core.state = JobState::Streaming;
            true
        } else {
            core.response_cookies = core
                .response
                .as_ref()
                .map(|r| r.set_cookie_lines())
                .unwrap_or_default();
            core.cookie_save_index = 0;
            false
        }
    };

    if skip {
        shared.delegate.on_headers_complete();
        return;
    }

    save_next_cookie(shared);
}

/// Drive the save cursor. Rejected entries advance inline; an accepted
/// entry issues one asynchronous store-set and the sequence resumes in
/// [`on_cookie_saved`] when its completion fires.
fn save_next_cookie(shared: &Arc<JobShared>) {
    loop {
        let step = {
            let mut core = shared.core.lock().unwrap();
            if core.cookie_save_index == core.response_cookies.len() {
                core.response_cookies.clear();
                core.cookie_save_index = 0;
                // Clear the IO-pending status.
                core.status = RequestStatus::Success;
                core.state = JobState::Streaming;
                None
            } else {
                // IO-pending until this entry's asynchronous completion
                // is observed.
                core.status = RequestStatus::IoPending;
                Some((
                    core.response_cookies[core.cookie_save_index].clone(),
                    core.request.url().clone(),
                    core.request.clone(),
                ))
            }
        };

        let Some((line, url, request)) = step else {
            shared.delegate.on_headers_complete();
            return;
        };

        let mut options = CookieOptions::with_httponly();
        let mut can_set_cookie = shared
            .cookie_policy
            .can_set_cookie(&request, &line, &mut options);
        if can_set_cookie {
            can_set_cookie = match CanonicalCookie::from_set_cookie_line(&url, &line) {
                Some(cookie) => shared.handler.can_set_cookie(&cookie),
                None => false,
            };
        }

        if can_set_cookie {
            let weak = Arc::downgrade(shared);
            shared.cookie_store.set_from_line(
                &url,
                &line,
                options,
                Box::new(move |_stored| {
                    // A store failure counts as "no cookie"; the
                    // sequence advances either way.
                    if let Some(shared) = weak.upgrade() {
                        on_cookie_saved(&shared);
                    }
                }),
            );
            return;
        }

        if !cookie_handled(shared) {
            return;
        }
    }
}

fn on_cookie_saved(shared: &Arc<JobShared>) {
    if cookie_handled(shared) {
        save_next_cookie(shared);
    }
}

/// Advance the cursor past the current entry. Returns false when the
/// job is no longer in progress, in which case the cancellation path
/// has been taken.
fn cookie_handled(shared: &Arc<JobShared>) -> bool {
    let in_progress = {
        let mut core = shared.core.lock().unwrap();
        core.cookie_save_index += 1;
        core.status.is_success()
    };
    if !in_progress {
        notify_canceled(shared);
    }
    in_progress
}
