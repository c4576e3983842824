use log::info;

/// Beep hook invoked when the sound timer is armed
pub trait Sound: Send {
    fn beep(&mut self);
}

/// Silent placeholder
#[derive(Default)]
pub struct Mute;

impl Sound for Mute {
    fn beep(&mut self) {}
}

/// Announces beeps on the log
#[derive(Default)]
pub struct Console {
    beeps: usize,
}

impl Console {
    pub fn beeps(&self) -> usize {
        self.beeps
    }
}

impl Sound for Console {
    fn beep(&mut self) {
        self.beeps += 1;
        info!("Beep");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_counts_beeps() {
        let mut console = Console::default();
        console.beep();
        console.beep();

        assert_eq!(console.beeps(), 2);
    }
}
