/// Arisan bookkeeping rules. Single source of truth for the reminder advisor
/// prompt and the MCP server instructions.
pub const RULES: &str = "\
1. Every member of a group pays the same monthly due. The primary group's due is split into \
categories (main, cash, sick, bereavement, and any extra \"other\" items set for the month); \
other groups collect one flat amount.\n\
2. Each category is ticked paid or unpaid on its own. A payment is paid only when every \
category is paid. An unpaid payment past its due date is late.\n\
3. Monthly dues are set per month. A month without its own settings uses the previous month's; \
with neither, dues are zero and no cycle can be opened for the primary group.\n\
4. Each cycle, one member per group receives the pot. A member wins at most once per rotation; \
once everyone in the group has won, the rotation closes and the next draw starts a new one with \
every member eligible again. The winner history is append-only: clearing the current winner \
does not erase who has already won.\n\
5. The cash balance is the paid cash dues of the primary group minus cash advances \
(expenses in category \"Talangan Kas\").\n\
6. Amounts are whole rupiah. Show them as \"Rp 1.250.000\".\n\
7. Reminders go through the member's preferred channel, at their preferred time when known, \
and always before the due date. Members who paid late before get earlier and more frequent \
reminders; members who always pay on time get a single gentle reminder.\n\
8. Messages to members are written in Bahasa Indonesia, polite and family-friendly.\n\
\n\
## Workflow\n\
1. `list_groups` and `list_members` to see who is in which group.\n\
2. Before a month starts, `get_monthly_settings` and `save_monthly_settings` to fix the dues, \
then `open_cycle` for each group.\n\
3. Tick payments with `set_payment` or `set_contribution` as money comes in. Use \
`payment_overview` to see who is still outstanding.\n\
4. At the gathering, `draw_winner` (or `set_winner` when the family picked by hand). \
`winner_history` shows who has already received the pot.\n\
5. For members who are late, `suggest_reminders` proposes a reminder schedule. Present it \
as-is; do not send messages on your own.\n\
\n\
Writes require an admin operator. Reads are open to everyone.";
