/// Mock SceneDevice for unit tests (no GPU required)
///
/// Tracks every handle it hands out and panics on misuse: double frees,
/// freeing a command buffer a pending submission still references, submitting
/// with a fence that was never reset. By default fences signal as soon as the
/// submission is made; `MockDevice::with_manual_fences()` keeps them pending
/// until the test calls `signal_all_fences()`.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::device::{
    CommandBufferId, CommandBufferLevel, CommandPoolId, FenceId, FenceStatus, PipelineStage,
    RenderPassBeginInfo, SceneDevice, SemaphoreId, SubmitInfo,
};
use crate::error::{Error, Result};

/// One recorded submission
#[derive(Debug, Clone)]
pub struct MockSubmission {
    pub command_buffers: Vec<CommandBufferId>,
    pub wait_semaphores: Vec<(SemaphoreId, PipelineStage)>,
    pub signal_semaphores: Vec<SemaphoreId>,
    pub fence: Option<FenceId>,
}

#[derive(Debug, Default)]
pub struct MockDeviceState {
    next_handle: u64,
    pub pools: FxHashSet<CommandPoolId>,
    pub live_command_buffers: FxHashMap<CommandBufferId, (CommandPoolId, CommandBufferLevel)>,
    /// Secondaries executed by each recorded primary
    pub primaries: FxHashMap<CommandBufferId, Vec<CommandBufferId>>,
    pub semaphores: FxHashSet<SemaphoreId>,
    /// Fence -> signaled
    pub fences: FxHashMap<FenceId, bool>,
    pub submissions: Vec<MockSubmission>,
    /// Command buffers referenced by work the GPU has not finished
    pub in_flight: FxHashMap<FenceId, Vec<CommandBufferId>>,
    unfenced: Vec<CommandBufferId>,
    pub auto_signal: bool,
    /// When set, each wait on a pending fence counts down and signals at zero
    pub signal_after_waits: Option<u32>,
    pub device_lost: bool,
    pub freed_count: usize,
    pub fence_waits: usize,
    pub last_begin_info: Option<RenderPassBeginInfo>,
}

impl MockDeviceState {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn signal(&mut self, fence: FenceId) {
        self.fences.insert(fence, true);
        self.in_flight.remove(&fence);
    }
}

pub struct MockDevice {
    state: Mutex<MockDeviceState>,
}

impl MockDevice {
    /// Device whose fences signal at submission time
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockDeviceState {
                auto_signal: true,
                ..Default::default()
            }),
        }
    }

    /// Device whose fences stay pending until signaled by the test
    pub fn with_manual_fences() -> Self {
        Self {
            state: Mutex::new(MockDeviceState::default()),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockDeviceState> {
        self.state.lock().unwrap()
    }

    pub fn signal_all_fences(&self) {
        let mut state = self.state();
        let fences: Vec<FenceId> = state.fences.keys().copied().collect();
        for fence in fences {
            state.signal(fence);
        }
    }

    pub fn live_command_buffer_count(&self) -> usize {
        self.state().live_command_buffers.len()
    }

    pub fn submission_count(&self) -> usize {
        self.state().submissions.len()
    }

    /// Number of submissions signaling `semaphore` and number waiting on it
    pub fn semaphore_usage(&self, semaphore: SemaphoreId) -> (usize, usize) {
        let state = self.state();
        let signals = state.submissions.iter().filter(|s| s.signal_semaphores.contains(&semaphore)).count();
        let waits = state
            .submissions
            .iter()
            .filter(|s| s.wait_semaphores.iter().any(|(waited, _)| *waited == semaphore))
            .count();
        (signals, waits)
    }

    /// Secondaries of the most recently submitted primary
    pub fn last_submitted_secondaries(&self) -> Vec<CommandBufferId> {
        let state = self.state();
        state
            .submissions
            .iter()
            .rev()
            .flat_map(|s| s.command_buffers.iter())
            .find_map(|cb| state.primaries.get(cb).cloned())
            .unwrap_or_default()
    }
}

impl SceneDevice for MockDevice {
    fn create_command_pool(&self) -> Result<CommandPoolId> {
        let mut state = self.state();
        let pool = CommandPoolId(state.next());
        state.pools.insert(pool);
        Ok(pool)
    }

    fn destroy_command_pool(&self, pool: CommandPoolId) {
        let mut state = self.state();
        assert!(state.pools.remove(&pool), "destroying unknown pool {:?}", pool);
        state.live_command_buffers.retain(|_, (owner, _)| *owner != pool);
    }

    fn allocate_command_buffer(
        &self,
        pool: CommandPoolId,
        level: CommandBufferLevel,
    ) -> Result<CommandBufferId> {
        let mut state = self.state();
        if state.device_lost {
            return Err(Error::DeviceLost);
        }
        assert!(state.pools.contains(&pool), "allocating from unknown pool {:?}", pool);
        let cb = CommandBufferId(state.next());
        state.live_command_buffers.insert(cb, (pool, level));
        Ok(cb)
    }

    fn free_command_buffers(&self, pool: CommandPoolId, command_buffers: &[CommandBufferId]) {
        let mut state = self.state();
        for cb in command_buffers {
            let in_flight = state.in_flight.values().any(|refs| refs.contains(cb))
                || state.unfenced.contains(cb);
            assert!(!in_flight, "freeing {:?} while the GPU may still use it", cb);

            match state.live_command_buffers.remove(cb) {
                Some((owner, _)) => assert_eq!(owner, pool, "{:?} freed to the wrong pool", cb),
                None => panic!("double free of {:?}", cb),
            }
            state.primaries.remove(cb);
            state.freed_count += 1;
        }
    }

    fn record_primary(
        &self,
        command_buffer: CommandBufferId,
        begin_info: &RenderPassBeginInfo,
        secondaries: &[CommandBufferId],
    ) -> Result<()> {
        let mut state = self.state();
        assert_eq!(
            state.live_command_buffers.get(&command_buffer).map(|(_, level)| *level),
            Some(CommandBufferLevel::Primary)
        );
        for cb in secondaries {
            assert_eq!(
                state.live_command_buffers.get(cb).map(|(_, level)| *level),
                Some(CommandBufferLevel::Secondary),
                "{:?} is not a live secondary",
                cb
            );
        }
        state.primaries.insert(command_buffer, secondaries.to_vec());
        state.last_begin_info = Some(begin_info.clone());
        Ok(())
    }

    fn create_semaphore(&self) -> Result<SemaphoreId> {
        let mut state = self.state();
        let semaphore = SemaphoreId(state.next());
        state.semaphores.insert(semaphore);
        Ok(semaphore)
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreId) {
        assert!(self.state().semaphores.remove(&semaphore));
    }

    fn create_fence(&self) -> Result<FenceId> {
        let mut state = self.state();
        let fence = FenceId(state.next());
        state.fences.insert(fence, false);
        Ok(fence)
    }

    fn destroy_fence(&self, fence: FenceId) {
        let mut state = self.state();
        assert!(state.fences.remove(&fence).is_some());
        state.in_flight.remove(&fence);
    }

    fn fence_status(&self, fence: FenceId) -> Result<FenceStatus> {
        let state = self.state();
        if state.device_lost {
            return Err(Error::DeviceLost);
        }
        match state.fences.get(&fence) {
            Some(true) => Ok(FenceStatus::Signaled),
            Some(false) => Ok(FenceStatus::NotReady),
            None => Err(Error::InvalidResource(format!("unknown fence {:?}", fence))),
        }
    }

    fn wait_for_fence(&self, fence: FenceId, _timeout: Duration) -> Result<FenceStatus> {
        let mut state = self.state();
        if state.device_lost {
            return Err(Error::DeviceLost);
        }
        state.fence_waits += 1;
        if state.fences.get(&fence) == Some(&true) {
            return Ok(FenceStatus::Signaled);
        }
        if let Some(remaining) = state.signal_after_waits {
            if remaining <= 1 {
                state.signal_after_waits = None;
                state.signal(fence);
                return Ok(FenceStatus::Signaled);
            }
            state.signal_after_waits = Some(remaining - 1);
        }
        Ok(FenceStatus::Timeout)
    }

    fn reset_fence(&self, fence: FenceId) -> Result<()> {
        let mut state = self.state();
        assert!(state.fences.contains_key(&fence));
        state.fences.insert(fence, false);
        Ok(())
    }

    fn submit(&self, info: &SubmitInfo<'_>) -> Result<()> {
        let mut state = self.state();
        if state.device_lost {
            return Err(Error::DeviceLost);
        }

        let mut referenced = Vec::new();
        for cb in info.command_buffers {
            assert!(state.live_command_buffers.contains_key(cb), "submitting dead {:?}", cb);
            referenced.push(*cb);
            if let Some(secondaries) = state.primaries.get(cb) {
                for secondary in secondaries {
                    assert!(
                        state.live_command_buffers.contains_key(secondary),
                        "{:?} executes freed {:?}",
                        cb, secondary
                    );
                }
                referenced.extend(secondaries.iter().copied());
            }
        }

        state.submissions.push(MockSubmission {
            command_buffers: info.command_buffers.to_vec(),
            wait_semaphores: info.wait_semaphores.to_vec(),
            signal_semaphores: info.signal_semaphores.to_vec(),
            fence: info.fence,
        });

        match info.fence {
            None => state.unfenced.extend(referenced),
            Some(fence) => {
                assert_eq!(state.fences.get(&fence), Some(&false), "submitting with a signaled fence");
                let mut refs = std::mem::take(&mut state.unfenced);
                refs.extend(referenced);
                state.in_flight.insert(fence, refs);
                if state.auto_signal {
                    state.signal(fence);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
