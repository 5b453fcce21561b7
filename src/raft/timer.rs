use std::time::Duration;

use rand::Rng;

use super::node::EventSender;
use super::rpc::Event;
use super::state::Role;

pub(crate) type TimeoutSampler = Box<dyn Fn(Role) -> Duration + Send>;

/// Versioned timeout source.
///
/// `reset` arms a fresh firing for the current role and bumps the version;
/// firings from earlier arms still in flight carry a stale version and are
/// filtered at the event-loop entry with `matches`. Versions start at 1, so
/// a version-0 timeout never matches and can be used as a synthetic event.
pub(crate) struct RaftTimer {
    version: u64,
    sampler: TimeoutSampler,
    inbox: EventSender,
}

impl RaftTimer {
    pub(crate) fn new(inbox: EventSender, sampler: TimeoutSampler) -> Self {
        Self {
            version: 0,
            sampler,
            inbox,
        }
    }

    /// Role-dependent durations: followers wait 2*base plus jitter,
    /// candidates 3*base plus jitter, leaders heartbeat every base.
    pub(crate) fn default_sampler(base: Duration) -> TimeoutSampler {
        Box::new(move |role| {
            let base_ms = base.as_millis() as u64;
            let fuzz = 2 * base_ms;
            match role {
                Role::Follower => {
                    Duration::from_millis(2 * base_ms + rand::thread_rng().gen_range(0..fuzz))
                }
                Role::Candidate => {
                    Duration::from_millis(3 * base_ms + rand::thread_rng().gen_range(0..fuzz))
                }
                Role::Leader => base,
            }
        })
    }

    pub(crate) fn set_sampler(&mut self, sampler: TimeoutSampler) {
        self.sampler = sampler;
    }

    /// Arm a new firing; any pending firing becomes stale.
    pub(crate) fn reset(&mut self, role: Role) {
        self.version += 1;
        let version = self.version;
        let duration = (self.sampler)(role);
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            inbox.send(Event::Timeout { version }).await;
        });
    }

    /// True iff `version` is the currently armed firing.
    pub(crate) fn matches(&self, version: u64) -> bool {
        version == self.version
    }

    #[cfg(test)]
    pub(crate) fn version(&self) -> u64 {
        self.version
    }
}
