use std::time::Duration;

use ironvnc_pdu::client::{PointerButtons, PointerEvent};
use tokio::time::sleep;

use crate::session::Session;
use crate::{SessionError, SessionErrorKind, SessionResult, keys};

/// Pause after each key transition within a combination.
const KEY_DELAY: Duration = Duration::from_millis(50);

/// Default pause between characters when typing text.
const TYPE_DELAY: Duration = Duration::from_millis(75);

/// Default pause between the two clicks of a double click.
const DOUBLE_CLICK_DELAY: Duration = Duration::from_millis(180);

impl Session {
    pub async fn key_down(&self, key: u32) -> SessionResult<()> {
        self.key_event(key, true).await
    }

    pub async fn key_up(&self, key: u32) -> SessionResult<()> {
        self.key_event(key, false).await
    }

    /// Taps a single character while holding the given modifier keysyms.
    ///
    /// Rejects multi-character strings; use [`Session::type_text`] for those.
    pub async fn key(&self, key: &str, modifiers: &[u32]) -> SessionResult<()> {
        let mut chars = key.chars();

        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(SessionError::new(
                "send key",
                SessionErrorKind::InvalidArgument("expected a single character"),
            ));
        };

        self.key_sym(keys::from_char(c), modifiers).await
    }

    /// Presses the modifiers in order, taps the key, then releases the
    /// modifiers in reverse order.
    ///
    /// Every transition is followed by a short pause so servers that poll
    /// input see each state. The pauses block only the calling task.
    pub async fn key_sym(&self, key: u32, modifiers: &[u32]) -> SessionResult<()> {
        for &modifier in modifiers {
            self.key_event(modifier, true).await?;
            sleep(KEY_DELAY).await;
        }

        self.key_event(key, true).await?;
        sleep(KEY_DELAY).await;
        self.key_event(key, false).await?;
        sleep(KEY_DELAY).await;

        for &modifier in modifiers.iter().rev() {
            self.key_event(modifier, false).await?;
            sleep(KEY_DELAY).await;
        }

        Ok(())
    }

    /// Types a string character by character at the default pace.
    pub async fn type_text(&self, text: &str) -> SessionResult<()> {
        self.type_text_with_delay(text, TYPE_DELAY).await
    }

    pub async fn type_text_with_delay(&self, text: &str, delay: Duration) -> SessionResult<()> {
        for c in text.chars() {
            self.key_sym(keys::from_char(c), &[]).await?;
            sleep(delay).await;
        }

        Ok(())
    }

    pub async fn send_ctrl_alt_del(&self) -> SessionResult<()> {
        self.key_sym(keys::DELETE, &[keys::CONTROL_LEFT, keys::ALT_LEFT]).await
    }

    /// Sends a pointer event at the given position, folding the transition
    /// into the persistent button mask.
    pub async fn pointer_event(&self, x: u16, y: u16, button: PointerButtons, down: bool) -> SessionResult<()> {
        let buttons = self.update_buttons(button, down);

        self.send(&PointerEvent { buttons, x, y }).await
    }

    pub async fn pointer_down(&self, x: u16, y: u16, button: PointerButtons) -> SessionResult<()> {
        self.pointer_event(x, y, button, true).await
    }

    pub async fn pointer_up(&self, x: u16, y: u16, button: PointerButtons) -> SessionResult<()> {
        self.pointer_event(x, y, button, false).await
    }

    pub async fn click(&self, x: u16, y: u16, button: PointerButtons) -> SessionResult<()> {
        self.pointer_event(x, y, button, true).await?;
        self.pointer_event(x, y, button, false).await
    }

    pub async fn left_click(&self, x: u16, y: u16) -> SessionResult<()> {
        self.click(x, y, PointerButtons::LEFT).await
    }

    pub async fn middle_click(&self, x: u16, y: u16) -> SessionResult<()> {
        self.click(x, y, PointerButtons::MIDDLE).await
    }

    pub async fn right_click(&self, x: u16, y: u16) -> SessionResult<()> {
        self.click(x, y, PointerButtons::RIGHT).await
    }

    /// Two clicks separated by the default pause.
    pub async fn double_click(&self, x: u16, y: u16, button: PointerButtons) -> SessionResult<()> {
        self.double_click_with_delay(x, y, button, DOUBLE_CLICK_DELAY).await
    }

    pub async fn double_click_with_delay(
        &self,
        x: u16,
        y: u16,
        button: PointerButtons,
        delay: Duration,
    ) -> SessionResult<()> {
        self.click(x, y, button).await?;
        sleep(delay).await;
        self.click(x, y, button).await
    }
}
