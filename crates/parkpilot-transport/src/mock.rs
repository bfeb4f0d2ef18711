//! Mock 传输后端
//!
//! 按脚本返回响应的连接工厂，用于在无网络环境下测试云端协议。
//! 克隆出的句柄共享同一份状态，测试可以在把 connector 交给客户端之后继续检查发送记录。

use crate::{Connector, Endpoint, SecureStream, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// 一次 `receive` 的脚本化结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    Data(Vec<u8>),
    Timeout,
    Reset,
    Closed,
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self::Data(text.as_bytes().to_vec())
    }
}

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<MockReply>,
    connect_failures: usize,
    send_failures: usize,
    connects: Vec<Endpoint>,
    requests: Vec<(Endpoint, Vec<u8>)>,
    receive_timeouts: Vec<Duration>,
}

/// 脚本化连接工厂
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 追加一个 `receive` 结果（所有连接共享同一个队列）
    pub fn push_reply(&self, reply: MockReply) {
        self.lock().replies.push_back(reply);
    }

    pub fn push_text(&self, text: &str) {
        self.push_reply(MockReply::text(text));
    }

    /// 接下来的 `n` 次连接失败
    pub fn fail_next_connects(&self, n: usize) {
        self.lock().connect_failures = n;
    }

    /// 接下来的 `n` 次发送失败（连接复位）
    pub fn fail_next_sends(&self, n: usize) {
        self.lock().send_failures = n;
    }

    /// 成功建立的连接数
    pub fn connect_count(&self) -> usize {
        self.lock().connects.len()
    }

    pub fn connected_endpoints(&self) -> Vec<Endpoint> {
        self.lock().connects.clone()
    }

    /// 成功发送的请求（按 UTF-8 解码）
    pub fn requests(&self) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
            .collect()
    }

    /// 发往指定主机的请求
    pub fn requests_to(&self, host: &str) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .filter(|(ep, _)| ep.host == host)
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
            .collect()
    }

    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }

    /// 每次连接时设置的接收超时
    pub fn receive_timeouts(&self) -> Vec<Duration> {
        self.lock().receive_timeouts.clone()
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    fn connect(
        &mut self,
        endpoint: &Endpoint,
        receive_timeout: Duration,
    ) -> Result<MockStream, TransportError> {
        let mut state = self.lock();
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(TransportError::Resolve(endpoint.host.clone()));
        }
        state.connects.push(endpoint.clone());
        state.receive_timeouts.push(receive_timeout);
        Ok(MockStream {
            endpoint: endpoint.clone(),
            state: Arc::clone(&self.state),
        })
    }
}

/// 脚本化连接
#[derive(Debug)]
pub struct MockStream {
    endpoint: Endpoint,
    state: Arc<Mutex<MockState>>,
}

impl SecureStream for MockStream {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.send_failures > 0 {
            state.send_failures -= 1;
            return Err(TransportError::Reset);
        }
        state.requests.push((self.endpoint.clone(), data.to_vec()));
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.replies.pop_front() {
            Some(MockReply::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    state
                        .replies
                        .push_front(MockReply::Data(data[n..].to_vec()));
                }
                if n == 0 {
                    return Err(TransportError::Closed);
                }
                Ok(n)
            },
            Some(MockReply::Timeout) | None => Err(TransportError::Timeout),
            Some(MockReply::Reset) => Err(TransportError::Reset),
            Some(MockReply::Closed) => Err(TransportError::Closed),
        }
    }
}
