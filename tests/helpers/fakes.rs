use std::sync::Mutex;

use async_trait::async_trait;
use gastown_town::domain::errors::ContainerError;
use gastown_town::domain::ports::{
    AgentStatusResponse, ContainerResult, ContainerRuntime, SendMessageRequest, StartAgentRequest,
    StartMergeRequest, StopAgentOptions, StreamTicket,
};

/// In-memory [`ContainerRuntime`] double. `start_agent` fails until
/// `fail_until` successful-looking calls have been rejected, after which it
/// starts succeeding — used to drive the circuit-breaker scenario.
#[allow(dead_code)]
pub struct FakeContainerRuntime {
    fail_start_agent: Mutex<bool>,
    status: Mutex<Option<AgentStatusResponse>>,
    start_agent_calls: Mutex<Vec<StartAgentRequest>>,
    start_merge_calls: Mutex<Vec<StartMergeRequest>>,
    fail_start_merge: Mutex<bool>,
}

#[allow(dead_code)]
impl FakeContainerRuntime {
    pub fn new() -> Self {
        Self {
            fail_start_agent: Mutex::new(false),
            status: Mutex::new(None),
            start_agent_calls: Mutex::new(Vec::new()),
            start_merge_calls: Mutex::new(Vec::new()),
            fail_start_merge: Mutex::new(false),
        }
    }

    pub fn set_start_agent_fails(&self, fails: bool) {
        *self.fail_start_agent.lock().unwrap() = fails;
    }

    pub fn set_start_merge_fails(&self, fails: bool) {
        *self.fail_start_merge.lock().unwrap() = fails;
    }

    pub fn set_status(&self, status: Option<AgentStatusResponse>) {
        *self.status.lock().unwrap() = status;
    }

    pub fn start_agent_call_count(&self) -> usize {
        self.start_agent_calls.lock().unwrap().len()
    }

    pub fn start_merge_calls(&self) -> Vec<StartMergeRequest> {
        self.start_merge_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeContainerRuntime {
    async fn start_agent(&self, req: StartAgentRequest) -> ContainerResult<()> {
        self.start_agent_calls.lock().unwrap().push(req);
        if *self.fail_start_agent.lock().unwrap() {
            return Err(ContainerError::Transport("simulated failure".to_string()));
        }
        Ok(())
    }

    async fn stop_agent(&self, _agent_id: &str, _opts: StopAgentOptions) -> ContainerResult<()> {
        Ok(())
    }

    async fn send_message(&self, _agent_id: &str, _req: SendMessageRequest) -> ContainerResult<()> {
        Ok(())
    }

    async fn agent_status(&self, _agent_id: &str) -> ContainerResult<AgentStatusResponse> {
        self.status
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ContainerError::Transport("no status configured".to_string()))
    }

    async fn stream_ticket(&self, _agent_id: &str) -> ContainerResult<StreamTicket> {
        Ok(StreamTicket { ticket: "fake-ticket".to_string(), expires_at: chrono::Utc::now() })
    }

    async fn start_merge(&self, req: StartMergeRequest) -> ContainerResult<()> {
        self.start_merge_calls.lock().unwrap().push(req);
        if *self.fail_start_merge.lock().unwrap() {
            return Err(ContainerError::Transport("simulated failure".to_string()));
        }
        Ok(())
    }

    async fn health(&self) -> ContainerResult<()> {
        Ok(())
    }
}

impl Default for FakeContainerRuntime {
    fn default() -> Self {
        Self::new()
    }
}
