//! Use cases: semantic screens exposing task-oriented actions
//!
//! A use case is assembled from explicit `(layout, action)` bindings and is
//! fully resolved when built. Tests call `review.confirm` and never see the
//! coordinates behind it.

use std::collections::BTreeMap;

use crate::backend::Backend;
use crate::common::{Error, Result};

use super::device::Device;
use super::layout::{ActionArg, Layout, LayoutKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    layout: Layout,
    action: &'static str,
}

/// A named screen and its exposed actions
#[derive(Debug, Clone)]
pub struct UseCase {
    name: String,
    device: Device,
    actions: BTreeMap<String, Binding>,
}

impl UseCase {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Exposed action names, sorted
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn exposes(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Layout and layout action behind an exposed action
    pub fn resolve(&self, action: &str) -> Option<(Layout, &'static str)> {
        self.actions.get(action).map(|b| (b.layout, b.action))
    }

    pub async fn perform(&self, backend: &mut Backend, action: &str, arg: &ActionArg) -> Result<()> {
        let binding = self
            .actions
            .get(action)
            .ok_or_else(|| Error::unsupported_layout(&self.name, action, self.device.name))?;
        tracing::debug!("{}.{} -> {}.{}", self.name, action, binding.layout.kind(), binding.action);
        binding.layout.invoke(backend, binding.action, arg).await
    }
}

/// Builds a [`UseCase`] from explicit layout bindings
pub struct UseCaseBuilder {
    name: String,
    device: Device,
    bindings: Vec<(LayoutKind, &'static str, String)>,
}

impl UseCaseBuilder {
    pub fn new(name: &str, device: Device) -> Self {
        Self {
            name: name.to_string(),
            device,
            bindings: Vec::new(),
        }
    }

    /// Re-expose layout actions under their own names
    pub fn expose(mut self, kind: LayoutKind, actions: &[&'static str]) -> Self {
        for &action in actions {
            self.bindings.push((kind, action, action.to_string()));
        }
        self
    }

    /// Re-expose one layout action under a task-oriented name
    pub fn expose_as(mut self, kind: LayoutKind, action: &'static str, alias: &str) -> Self {
        self.bindings.push((kind, action, alias.to_string()));
        self
    }

    /// Resolve every binding against the device
    pub fn build(self) -> Result<UseCase> {
        let mut actions = BTreeMap::new();
        for (kind, action, alias) in self.bindings {
            let layout = Layout::new(kind, self.device)?;
            if !layout.supports(action) {
                return Err(Error::unsupported_layout(kind.name(), action, self.device.name));
            }
            if actions.insert(alias.clone(), Binding { layout, action }).is_some() {
                return Err(Error::Config(format!(
                    "Use case '{}' exposes '{}' twice",
                    self.name, alias
                )));
            }
        }
        Ok(UseCase {
            name: self.name,
            device: self.device,
            actions,
        })
    }
}

/// The standard use cases of one device
#[derive(Debug, Clone)]
pub struct UseCaseRegistry {
    device: Device,
    cases: BTreeMap<String, UseCase>,
}

impl UseCaseRegistry {
    pub fn for_device(device: Device) -> Result<Self> {
        let builders = if device.is_touchscreen {
            touch_use_cases(device)
        } else {
            button_use_cases(device)
        };
        let mut cases = BTreeMap::new();
        for builder in builders {
            let case = builder.build()?;
            cases.insert(case.name.clone(), case);
        }
        Ok(Self { device, cases })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn get(&self, name: &str) -> Result<&UseCase> {
        self.cases.get(name).ok_or_else(|| Error::UnknownUseCase {
            name: name.to_string(),
            device: self.device.name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    pub async fn perform(
        &self,
        backend: &mut Backend,
        use_case: &str,
        action: &str,
        arg: &ActionArg,
    ) -> Result<()> {
        self.get(use_case)?.perform(backend, action, arg).await
    }
}

fn button_use_cases(device: Device) -> Vec<UseCaseBuilder> {
    vec![UseCaseBuilder::new("buttons", device).expose(LayoutKind::Buttons, &["right", "left", "both"])]
}

fn touch_use_cases(device: Device) -> Vec<UseCaseBuilder> {
    use LayoutKind::*;

    vec![
        UseCaseBuilder::new("home", device)
            .expose_as(UpperRightButton, "tap", "info")
            .expose_as(UpperRightButton, "tap", "settings")
            .expose_as(LowerMiddleButton, "tap", "quit"),
        UseCaseBuilder::new("settings", device)
            .expose_as(LowerMiddleButton, "tap", "single_page_exit")
            .expose_as(LowerLeftButton, "tap", "multi_page_exit")
            .expose_as(LowerMiddleButton, "tap", "previous")
            .expose_as(LowerRightButton, "tap", "next"),
        UseCaseBuilder::new("sub_settings", device)
            .expose_as(UpperLeftButton, "tap", "exit")
            .expose_as(LowerLeftButton, "tap", "previous")
            .expose_as(LowerRightButton, "tap", "next"),
        UseCaseBuilder::new("choice", device)
            .expose_as(AboveLowerMiddleButton, "tap", "confirm")
            .expose_as(LowerMiddleButton, "tap", "reject"),
        UseCaseBuilder::new("status", device).expose_as(TappableCenter, "tap", "dismiss"),
        UseCaseBuilder::new("review", device)
            .expose(TappableCenter, &["tap"])
            .expose_as(UpperLeftButton, "tap", "previous")
            .expose_as(LowerMiddleButton, "tap", "reject")
            .expose_as(AboveLowerMiddleButton, "hold", "confirm"),
        UseCaseBuilder::new("view_details", device)
            .expose_as(LowerLeftButton, "tap", "exit")
            .expose_as(LowerMiddleButton, "tap", "previous")
            .expose_as(LowerRightButton, "tap", "next"),
        UseCaseBuilder::new("address_confirmation", device)
            .expose(AboveLowerMiddleButton, &["tap"])
            .expose_as(LowerMiddleButton, "tap", "exit_qr")
            .expose_as(AboveLowerMiddleButton, "tap", "confirm")
            .expose_as(LowerMiddleButton, "tap", "cancel"),
        UseCaseBuilder::new("center", device).expose(Center, &["tap", "swipe_left", "swipe_right"]),
        UseCaseBuilder::new("choice_list", device).expose(ChoiceList, &["choose"]),
        UseCaseBuilder::new("suggestions", device).expose(Suggestions, &["choose"]),
        UseCaseBuilder::new("keyboard", device).expose(LetterOnlyKeyboard, &["write", "back"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockDevice;

    #[test]
    fn test_registry_per_family() {
        let stax = UseCaseRegistry::for_device(Device::STAX).unwrap();
        assert!(stax.get("review").is_ok());
        assert!(matches!(
            stax.get("buttons"),
            Err(Error::UnknownUseCase { .. })
        ));

        let nano = UseCaseRegistry::for_device(Device::NANOS).unwrap();
        assert_eq!(nano.names().collect::<Vec<_>>(), vec!["buttons"]);
    }

    #[test]
    fn test_builder_rejects_foreign_layouts() {
        let err = UseCaseBuilder::new("home", Device::NANOX)
            .expose_as(LayoutKind::UpperRightButton, "tap", "info")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedLayout { .. }));
    }

    #[test]
    fn test_builder_rejects_unknown_and_duplicate_actions() {
        assert!(UseCaseBuilder::new("x", Device::STAX)
            .expose(LayoutKind::TappableCenter, &["hold"])
            .build()
            .is_err());
        assert!(UseCaseBuilder::new("x", Device::STAX)
            .expose_as(LayoutKind::TappableCenter, "tap", "go")
            .expose_as(LayoutKind::LowerMiddleButton, "tap", "go")
            .build()
            .is_err());
    }

    #[test]
    fn test_review_confirm_is_long_press() {
        let registry = UseCaseRegistry::for_device(Device::FLEX).unwrap();
        let review = registry.get("review").unwrap();
        let (layout, action) = review.resolve("confirm").unwrap();
        assert_eq!(layout.kind(), LayoutKind::AboveLowerMiddleButton);
        assert_eq!(action, "hold");
        assert_eq!(
            review.actions().collect::<Vec<_>>(),
            vec!["confirm", "previous", "reject", "tap"]
        );
    }

    #[tokio::test]
    async fn test_perform_routes_to_layout() {
        let mock = MockDevice::new();
        let journal = mock.journal();
        let mut backend = Backend::new(Box::new(mock), Device::STAX);
        backend.open().await.unwrap();

        let registry = UseCaseRegistry::for_device(Device::STAX).unwrap();
        registry
            .perform(&mut backend, "home", "settings", &ActionArg::None)
            .await
            .unwrap();
        assert_eq!(journal.gestures(), vec!["touch (342, 55) 100ms"]);

        assert!(matches!(
            registry
                .perform(&mut backend, "home", "fly", &ActionArg::None)
                .await,
            Err(Error::UnsupportedLayout { .. })
        ));
    }
}
