//! Operator console: Menu-driven REPL for sending invitations and listing guests.
//!
//! Reads commands line by line from any async reader and writes to any
//! async writer; the binary wires it to stdin/stdout.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::guests::{Guest, RsvpStatus};
use crate::pipeline::RsvpHandler;

const MENU: &str = "\nCommands:\n  \
                    1. Send invitation\n  \
                    2. View all guests\n  \
                    3. View guests by status\n  \
                    4. Exit\n\n\
                    Enter command (1-4): ";

const STATUS_MENU: &str = "\nSelect status:\n  \
                           1. Pending\n  \
                           2. Accepted\n  \
                           3. Declined\n\
                           Enter choice (1-3): ";

fn separator() -> String {
    "-".repeat(60)
}

/// Interactive operator console.
pub struct OperatorConsole {
    handler: Arc<RsvpHandler>,
}

impl OperatorConsole {
    pub fn new(handler: Arc<RsvpHandler>) -> Self {
        Self { handler }
    }

    /// Run until the exit command or end of input.
    pub async fn run<R, W>(&self, reader: R, mut out: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        loop {
            write(&mut out, MENU).await?;

            let Some(line) = lines.next_line().await? else {
                break; // EOF
            };

            match line.trim() {
                "1" => self.send_invitation(&mut lines, &mut out).await?,
                "2" => self.view_all(&mut out).await?,
                "3" => self.view_by_status(&mut lines, &mut out).await?,
                "4" => {
                    write(&mut out, "Exiting...\n").await?;
                    break;
                }
                "" => {}
                _ => write(&mut out, "Invalid command. Please try again.\n").await?,
            }
        }

        Ok(())
    }

    async fn send_invitation<R, W>(&self, lines: &mut Lines<R>, out: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write(out, "Enter guest name: ").await?;
        let Some(name) = lines.next_line().await? else {
            return Ok(());
        };
        let name = name.trim().to_string();

        write(out, "Enter phone number (e.g. 0501234567 or +972501234567): ").await?;
        let Some(phone) = lines.next_line().await? else {
            return Ok(());
        };
        let phone = phone.trim().to_string();

        if name.is_empty() || phone.is_empty() {
            return write(out, "Name and phone number are both required.\n").await;
        }

        write(out, &format!("\nSending invitation to {name} ({phone})...\n")).await?;
        match self.handler.send_invitation(&phone, &name).await {
            Ok(_) => write(out, "✅ Invitation sent successfully!\n").await,
            Err(e) => {
                tracing::warn!(phone = %phone, error = %e, "Invitation failed");
                write(out, &format!("❌ Error sending invitation: {e}\n")).await
            }
        }
    }

    async fn view_all<W>(&self, out: &mut W) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let guests = self.handler.store().list_all().await;
        if guests.is_empty() {
            return write(out, "\nNo guests found.\n").await;
        }

        let mut text = format!("\n📋 All Guests ({} total):\n{}\n", guests.len(), separator());
        for guest in &guests {
            text.push_str(&format_guest(guest, true));
        }
        write(out, &text).await
    }

    async fn view_by_status<R, W>(&self, lines: &mut Lines<R>, out: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write(out, STATUS_MENU).await?;
        let Some(choice) = lines.next_line().await? else {
            return Ok(());
        };

        let status = match choice.trim() {
            "1" => RsvpStatus::Pending,
            "2" => RsvpStatus::Accepted,
            "3" => RsvpStatus::Declined,
            other => match other.parse::<RsvpStatus>() {
                Ok(status) => status,
                Err(_) => return write(out, "Invalid choice.\n").await,
            },
        };

        let guests = self.handler.store().list_by_status(status).await;
        if guests.is_empty() {
            return write(out, &format!("\nNo guests with status '{status}'.\n")).await;
        }

        let mut text = format!(
            "\n📋 Guests with status '{status}' ({} total):\n{}\n",
            guests.len(),
            separator()
        );
        for guest in &guests {
            text.push_str(&format_guest(guest, false));
        }
        write(out, &text).await
    }
}

fn format_guest(guest: &Guest, with_status: bool) -> String {
    let mut text = format!("Name: {}\nPhone: {}\n", guest.name, guest.phone_number);
    if with_status {
        text.push_str(&format!("Status: {}\n", guest.rsvp_status));
    }
    if let Some(date) = guest.rsvp_date {
        text.push_str(&format!("RSVP Date: {}\n", date.format("%Y-%m-%d %H:%M:%S")));
    }
    if let Some(ref notes) = guest.notes {
        text.push_str(&format!("Notes: {notes}\n"));
    }
    text.push_str(&separator());
    text.push('\n');
    text
}

async fn write<W>(out: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}
