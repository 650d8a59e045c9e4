//! Stock review flows
//!
//! Each flow pages through a review until a known text shows up, then
//! approves or rejects. Which instructions do that depends on the device
//! family.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::Button;
use crate::common::Result;
use crate::screen::Device;

use super::engine::{NavigateOptions, Navigator};
use super::instruction::Instruction;
use super::report::RunReport;

/// Bound on paging through a review
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    ReviewApprove,
    ReviewReject,
    AddressReviewApprove,
    AddressReviewReject,
}

/// Instructions and stop text of a flow on one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationScenario {
    pub navigate: Instruction,
    pub validation: Vec<Instruction>,
    pub text: String,
}

impl NavigationScenario {
    pub fn new(flow: Flow, device: &Device) -> Self {
        if device.is_nano() {
            let text = match flow {
                Flow::ReviewApprove | Flow::AddressReviewApprove => "Approve",
                Flow::ReviewReject | Flow::AddressReviewReject => "Reject",
            };
            return Self {
                navigate: Instruction::press(Button::Right),
                validation: vec![Instruction::press(Button::Both)],
                text: text.to_string(),
            };
        }

        let (mut validation, text) = match flow {
            Flow::ReviewApprove => (vec![Instruction::use_case("review", "confirm")], "Hold to sign"),
            Flow::ReviewReject => (
                vec![
                    Instruction::use_case("review", "reject"),
                    Instruction::use_case("choice", "confirm"),
                ],
                "Hold to sign",
            ),
            Flow::AddressReviewApprove => (
                vec![Instruction::use_case("address_confirmation", "confirm")],
                "Confirm",
            ),
            Flow::AddressReviewReject => (
                vec![Instruction::use_case("address_confirmation", "cancel")],
                "Confirm",
            ),
        };
        // every touch flow ends on a status modal
        validation.push(Instruction::use_case("status", "dismiss"));

        Self {
            navigate: Instruction::use_case("review", "tap"),
            validation,
            text: text.to_string(),
        }
    }

    /// Replace the stop text, for apps with custom review screens
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

impl Navigator {
    /// Run a stock flow, comparing or recording when a test case is given
    pub async fn run_flow(
        &mut self,
        flow: Flow,
        test_case: Option<&str>,
    ) -> Result<Option<RunReport>> {
        let scenario = NavigationScenario::new(flow, self.backend().device());
        match test_case {
            Some(test_case) => self
                .navigate_until_text_and_compare(
                    test_case,
                    &scenario.navigate,
                    &scenario.validation,
                    &scenario.text,
                    DEFAULT_TIMEOUT,
                    NavigateOptions::default(),
                )
                .await
                .map(Some),
            None => self
                .navigate_until_text(
                    &scenario.navigate,
                    &scenario.validation,
                    &scenario.text,
                    DEFAULT_TIMEOUT,
                )
                .await
                .map(|_| None),
        }
    }

    /// Page through a transaction review and approve it
    pub async fn review_approve(&mut self, test_case: Option<&str>) -> Result<Option<RunReport>> {
        self.run_flow(Flow::ReviewApprove, test_case).await
    }

    pub async fn review_reject(&mut self, test_case: Option<&str>) -> Result<Option<RunReport>> {
        self.run_flow(Flow::ReviewReject, test_case).await
    }

    pub async fn address_review_approve(
        &mut self,
        test_case: Option<&str>,
    ) -> Result<Option<RunReport>> {
        self.run_flow(Flow::AddressReviewApprove, test_case).await
    }

    pub async fn address_review_reject(
        &mut self,
        test_case: Option<&str>,
    ) -> Result<Option<RunReport>> {
        self.run_flow(Flow::AddressReviewReject, test_case).await
    }
}
